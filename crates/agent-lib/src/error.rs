//! Error types for the polling pipeline

use thiserror::Error;

/// Errors raised while polling GKE or pushing metrics
#[derive(Debug, Error)]
pub enum PollError {
    /// The request never produced a response (DNS, TLS, connect, timeout)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status
    #[error("{service} returned {status} for {url}: {body}")]
    Status {
        service: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No usable access token could be obtained
    #[error("failed to obtain GCP access token: {0}")]
    Auth(String),

    /// Instance group locator does not have the expected path shape
    #[error("malformed instance group locator {locator:?}: {reason}")]
    MalformedLocator { locator: String, reason: String },

    /// Any other failure reported by a remote collaborator
    #[error("{0}")]
    Remote(String),
}

impl PollError {
    /// Whether retrying the call that produced this error can help.
    ///
    /// Only malformed locators are permanent; every remote failure is
    /// treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PollError::MalformedLocator { .. })
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Transport { .. } => "transport",
            PollError::Status { .. } => "status",
            PollError::Decode { .. } => "decode",
            PollError::Auth(_) => "auth",
            PollError::MalformedLocator { .. } => "malformed_locator",
            PollError::Remote(_) => "remote",
        }
    }
}

pub type Result<T> = std::result::Result<T, PollError>;
