//! Mapping pass results onto the push caller's response contract.

use autoload_core::{AutoloadError, Disposition};

use crate::orchestrator::Outcome;

/// Status and body returned to the push caller.
///
/// 2xx acknowledges the notification, 4xx acknowledges a request that can never succeed,
/// 5xx asks the caller to redeliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HandlerResponse {
    /// Build a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the caller should stop redelivering.
    #[must_use]
    pub fn acknowledges(&self) -> bool {
        self.status < 500
    }

    /// Response for a completed pass.
    #[must_use]
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Launched { .. } => Self::new(200, "OK"),
            Outcome::Skipped { .. } => Self::new(204, ""),
        }
    }

    /// Response for a failed pass.
    #[must_use]
    pub fn from_error(err: &AutoloadError) -> Self {
        let disposition = err.disposition();
        let body = match disposition {
            Disposition::Permanent => err.user_message(),
            Disposition::Transient => format!("Internal error: {err}"),
        };
        Self::new(disposition.status_code(), body)
    }
}
