//! Control-plane request and outcome types.

use serde::Serialize;
use thiserror::Error;

/// An operation to apply on the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardRequest {
    /// Invalidate objects on `proxy` matching `expression`.
    Ban { proxy: String, expression: String },
    /// Replace the active configuration with `content`.
    VclUpdate { name: String, content: String },
}

impl ForwardRequest {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardRequest::Ban { .. } => "ban",
            ForwardRequest::VclUpdate { .. } => "configuration update",
        }
    }
}

/// How a forward ended, as far as the CLI client needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The API answered 200.
    Accepted,
    /// The API answered with another HTTP status.
    Rejected { status: u16 },
    /// The request could not be built, sent, or read.
    Failed,
}

impl ForwardOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ForwardOutcome::Accepted => "accepted",
            ForwardOutcome::Rejected { .. } => "rejected",
            ForwardOutcome::Failed => "failed",
        }
    }
}

/// Errors talking to the control-plane API.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Endpoint is not a usable http(s) URL.
    #[error("invalid API endpoint '{0}'")]
    InvalidEndpoint(String),

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request body could not be serialised.
    #[error("failed to serialise request: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Connection, TLS, or body transfer failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No response within the configured timeout.
    #[error("API request timed out after {0} seconds")]
    Timeout(u64),
}

/// JSON body for ban requests.
#[derive(Debug, Serialize)]
pub(crate) struct BanPayload<'a> {
    pub proxy: &'a str,
    pub ban: &'a str,
}

/// JSON body for configuration updates.
#[derive(Debug, Serialize)]
pub(crate) struct VclUpdatePayload<'a> {
    pub personality: &'a str,
    pub message: String,
    pub content: &'a str,
}
