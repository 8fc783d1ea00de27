use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected response from {url}: {status}")]
    BackendResponse { url: String, status: String },

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = CheckError> = std::result::Result<T, E>;
