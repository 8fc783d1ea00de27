use crate::CheckError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHECK_ENDPOINT: &str = "http://localhost:5000/api/check";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(endpoint: &str) -> Result<Self, CheckError> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CheckError::InvalidArgument(format!(
                "endpoint must be http or https: {endpoint}"
            )));
        }

        Ok(Self {
            endpoint,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reports may come back as a path relative to the service host.
    pub fn resolve_report_url(&self, report: &str) -> Result<Url, CheckError> {
        Ok(self.endpoint.join(report)?)
    }
}
