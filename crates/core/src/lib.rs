pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod payload;
pub mod render;
pub mod traits;

pub use client::HttpCheckClient;
pub use config::{ClientConfig, DEFAULT_CHECK_ENDPOINT};
pub use error::CheckError;
pub use handler::{SubmissionHandler, SubmissionOutcome, TRANSPORT_ERROR_PREFIX};
pub use models::{content_type_for, CheckResponse, MatchResult, SubmissionInput, UploadFile};
pub use payload::{load_upload, PayloadPart, SubmissionPayload};
pub use render::{
    escape_html, ExcerptPolicy, HtmlPresenter, MatchCard, ReportLink, TerminalPresenter,
};
pub use traits::{CheckTransport, Presenter};
