//! Error types for the REST dispatcher.
//!
//! # Design
//! Configuration and method errors are raised before any network traffic.
//! Upstream failures carry the message the sibling service reported and a
//! status code. An error body that cannot be read as `{"message": ...}` gets
//! its own variant so callers can tell a well-formed rejection from a broken
//! upstream, while still getting a usable message and code from it.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RestError>;

/// Status code reported when the upstream status is unavailable.
pub const FALLBACK_STATUS: u16 = 500;

/// Errors returned by `RequestDispatcher` and its collaborators.
#[derive(Debug, Error)]
pub enum RestError {
    /// A required configuration key or service constant is absent.
    #[error("configuration missing: `{0}` is not set or is empty")]
    ConfigurationMissing(String),

    /// The verb is not one of GET, POST, PUT, PATCH or DELETE.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The upstream service rejected the call with a `{"message": ...}` body.
    #[error("{message}")]
    Upstream { message: String, code: u16 },

    /// The upstream service rejected the call with a body that is not JSON or
    /// carries no string `message` field.
    #[error("upstream returned status {code} with an unreadable error body: {reason}")]
    MalformedUpstream {
        code: u16,
        body: String,
        reason: String,
    },

    /// A configuration document could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A file attachment could not be opened when the request was sent.
    #[error("file parameter `{key}` could not be opened: {source}")]
    FileUnreadable {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A successful response body is not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl RestError {
    /// Status code attached to an upstream failure.
    pub fn code(&self) -> Option<u16> {
        match self {
            RestError::Upstream { code, .. } | RestError::MalformedUpstream { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Human-readable message. For upstream failures this is the message the
    /// service sent, or a generic one when the body was unreadable.
    pub fn message(&self) -> String {
        match self {
            RestError::Upstream { message, .. } => message.clone(),
            RestError::MalformedUpstream { code, .. } => {
                format!("upstream service failed with status {code}")
            }
            other => other.to_string(),
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, RestError::Upstream { .. } | RestError::MalformedUpstream { .. })
    }
}

/// Status code to report for a failed response; zero means "unknown".
pub(crate) fn status_or_fallback(status: u16) -> u16 {
    if status != 0 {
        status
    } else {
        FALLBACK_STATUS
    }
}
