//! Monitor poller: one HTTP GET per monitor per polling cycle.
//!
//! Builds the uptime report URL from the API key and monitor id, issues a
//! timed GET and decodes the JSON body. No retries, no backoff: a failed
//! poll is reported once and the next cycle starts from scratch.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Root of the HetrixTools v1 API.
pub const API_BASE: &str = "https://api.hetrixtools.com/v1";

/// Upper bound for a single report request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a single poll produced no result.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Polls uptime reports for monitors belonging to one API key.
#[derive(Clone)]
pub struct MonitorPoller {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl MonitorPoller {
    /// Create a poller on a shared HTTP client.
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Point the poller at a different API root (used against mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout (defaults to [`REQUEST_TIMEOUT`]).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-request timeout currently in effect.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Uptime report URL for `monitor_id`. Both values are substituted verbatim.
    pub fn report_url(&self, monitor_id: &str) -> String {
        report_url(&self.base_url, &self.api_key, monitor_id)
    }

    /// Fetch the uptime report for one monitor.
    pub async fn fetch(&self, monitor_id: &str) -> Result<Value, PollError> {
        let url = self.report_url(monitor_id);
        let shown = self.redacted_url(monitor_id);

        debug!(monitor_id = %monitor_id, url = %shown, "Requesting uptime report");

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(shown.clone(), e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(PollError::Status { url: shown, status });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.classify(shown.clone(), e))?;

        serde_json::from_str(&body).map_err(|source| PollError::Decode { url: shown, source })
    }

    /// Fetch the uptime report, logging and swallowing any failure.
    pub async fn poll(&self, monitor_id: &str) -> Option<Value> {
        match self.fetch(monitor_id).await {
            Ok(report) => Some(report),
            Err(e @ PollError::Status { .. }) => {
                error!(monitor_id = %monitor_id, "{}", e);
                None
            }
            Err(e) => {
                error!(monitor_id = %monitor_id, error = %e, "Error updating HetrixTools data");
                None
            }
        }
    }

    fn redacted_url(&self, monitor_id: &str) -> String {
        report_url(&self.base_url, "***", monitor_id)
    }

    fn classify(&self, url: String, source: reqwest::Error) -> PollError {
        if source.is_timeout() {
            PollError::Timeout { url, timeout: self.timeout }
        } else {
            // reqwest embeds the request URL, API key included, in its message
            PollError::Request { url, source: source.without_url() }
        }
    }
}

fn report_url(base: &str, api_key: &str, monitor_id: &str) -> String {
    format!("{}/{}/uptime/report/{}/", base, api_key, monitor_id)
}
