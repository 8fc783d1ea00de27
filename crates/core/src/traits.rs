use crate::payload::SubmissionPayload;
use crate::render::{MatchCard, ReportLink};
use crate::{CheckError, CheckResponse};
use async_trait::async_trait;

#[async_trait]
pub trait CheckTransport {
    async fn check(&self, payload: SubmissionPayload) -> Result<CheckResponse, CheckError>;
}

/// Display regions a submission writes into: results, report link and a progress indicator.
pub trait Presenter {
    fn clear(&mut self);

    fn show_progress(&mut self);

    fn hide_progress(&mut self);

    /// Replaces the results region with a message.
    fn show_error(&mut self, message: &str);

    fn render_summary(&mut self, plagiarism_percentage: f64);

    fn render_matches(&mut self, cards: &[MatchCard]);

    fn render_report_link(&mut self, link: &ReportLink);
}
