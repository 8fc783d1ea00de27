use crate::payload::{digest_bytes, SubmissionPayload};
use crate::render::{ExcerptPolicy, MatchCard, ReportLink};
use crate::traits::{CheckTransport, Presenter};
use crate::{CheckError, SubmissionInput};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

pub const TRANSPORT_ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Rendered {
        matches: usize,
        report: Option<String>,
    },
    /// The service answered with an error message, shown verbatim.
    ServiceError(String),
    /// The request failed or the body could not be parsed.
    TransportError(String),
    /// A newer submission was issued while this one was in flight.
    Superseded { sequence: u64 },
}

/// Runs the submit/render cycle. Only the most recently issued submission
/// writes its result to the presenter.
pub struct SubmissionHandler<T, P>
where
    T: CheckTransport,
    P: Presenter,
{
    transport: T,
    presenter: Mutex<P>,
    latest: AtomicU64,
    policy: ExcerptPolicy,
}

impl<T, P> SubmissionHandler<T, P>
where
    T: CheckTransport + Send + Sync,
    P: Presenter + Send,
{
    pub fn new(transport: T, presenter: P) -> Self {
        Self {
            transport,
            presenter: Mutex::new(presenter),
            latest: AtomicU64::new(0),
            policy: ExcerptPolicy::default(),
        }
    }

    pub fn with_excerpt_policy(mut self, policy: ExcerptPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn presenter(&self) -> &Mutex<P> {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter.into_inner()
    }

    pub async fn submit(&self, input: &SubmissionInput) -> SubmissionOutcome {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut presenter = self.presenter.lock().await;
            if self.latest.load(Ordering::SeqCst) == sequence {
                presenter.clear();
                presenter.show_progress();
            }
        }

        let payload = SubmissionPayload::from_input(input);
        if let Some(file) = &input.file {
            tracing::debug!(
                sequence,
                file = %file.file_name,
                bytes = file.bytes.len(),
                sha256 = %digest_bytes(&file.bytes),
                "attaching document"
            );
        }
        tracing::info!(sequence, parts = ?payload.field_names(), "submitting for check");

        let result = self.transport.check(payload).await;

        let mut presenter = self.presenter.lock().await;
        if self.latest.load(Ordering::SeqCst) != sequence {
            tracing::debug!(sequence, "discarding response of superseded submission");
            return SubmissionOutcome::Superseded { sequence };
        }
        presenter.hide_progress();

        let response = match result {
            Ok(response) => response,
            Err(error) => return report_failure(&mut *presenter, sequence, error),
        };

        if let Some(error) = response.service_error() {
            tracing::warn!(sequence, error, "service reported an error");
            presenter.show_error(error);
            return SubmissionOutcome::ServiceError(error.to_string());
        }

        let matches = match response.matches() {
            Ok(matches) => matches,
            Err(error) => return report_failure(&mut *presenter, sequence, error),
        };

        if let Some(percentage) = response.plagiarism_percentage {
            presenter.render_summary(percentage);
        }

        let cards = MatchCard::cards_for(matches, self.policy);
        presenter.render_matches(&cards);

        let report = response.report_url().map(str::to_string);
        if let Some(href) = &report {
            presenter.render_report_link(&ReportLink::new(href.as_str()));
        }

        tracing::info!(sequence, matches = cards.len(), report = ?report, "check rendered");
        SubmissionOutcome::Rendered {
            matches: cards.len(),
            report,
        }
    }
}

fn report_failure<P: Presenter>(
    presenter: &mut P,
    sequence: u64,
    error: CheckError,
) -> SubmissionOutcome {
    tracing::warn!(sequence, %error, "check request failed");
    let message = format!("{TRANSPORT_ERROR_PREFIX}{error}");
    presenter.show_error(&message);
    SubmissionOutcome::TransportError(message)
}
