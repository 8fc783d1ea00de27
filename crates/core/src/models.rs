use crate::CheckError;
use serde::{Deserialize, Serialize};

/// What the user asked to check: free text, an uploaded document, or both.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub text: Option<String>,
    pub file: Option<UploadFile>,
}

impl SubmissionInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file: None,
        }
    }

    pub fn from_file(file: UploadFile) -> Self {
        Self {
            text: None,
            file: Some(file),
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_text() && self.file.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

/// Content types for the document formats the checking service extracts text from.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" | "text" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub source: String,
    pub similarity: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Absent on error-only bodies; required otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plagiarism_percentage: Option<f64>,
}

impl CheckResponse {
    /// Error reported by the service. An empty string counts as no error.
    pub fn service_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|error| !error.is_empty())
    }

    /// Matches of a successful check. A body with neither an error nor a
    /// `matches` list is malformed.
    pub fn matches(&self) -> Result<&[MatchResult], CheckError> {
        self.matches.as_deref().ok_or_else(|| {
            CheckError::Serialization(<serde_json::Error as serde::de::Error>::missing_field(
                "matches",
            ))
        })
    }

    pub fn report_url(&self) -> Option<&str> {
        self.pdf.as_deref().filter(|pdf| !pdf.is_empty())
    }
}
