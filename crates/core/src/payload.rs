use crate::{CheckError, SubmissionInput, UploadFile};
use reqwest::multipart::{Form, Part};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const TEXT_FIELD: &str = "text";
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadPart {
    Text(String),
    File(UploadFile),
}

impl PayloadPart {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Text(_) => TEXT_FIELD,
            Self::File(_) => FILE_FIELD,
        }
    }
}

/// Multipart body for one submission, kept as plain data until it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPayload {
    parts: Vec<PayloadPart>,
}

impl SubmissionPayload {
    pub fn from_input(input: &SubmissionInput) -> Self {
        let mut parts = Vec::new();

        if let Some(text) = input.text.as_ref().filter(|text| !text.is_empty()) {
            parts.push(PayloadPart::Text(text.clone()));
        }
        if let Some(file) = &input.file {
            parts.push(PayloadPart::File(file.clone()));
        }

        Self { parts }
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.parts.iter().map(PayloadPart::field_name).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.parts.iter().any(|part| part.field_name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn into_form(self) -> Result<Form, CheckError> {
        let mut form = Form::new();

        for part in self.parts {
            form = match part {
                PayloadPart::Text(text) => form.text(TEXT_FIELD, text),
                PayloadPart::File(file) => {
                    let part = Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.content_type)?;
                    form.part(FILE_FIELD, part)
                }
            };
        }

        Ok(form)
    }
}

pub async fn load_upload(path: &Path) -> Result<UploadFile, CheckError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CheckError::MissingFileName(path.display().to_string()))?;
    let bytes = tokio::fs::read(path).await?;

    Ok(UploadFile::new(file_name, bytes))
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
