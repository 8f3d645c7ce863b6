//! Error types for the legacy API client
//!
//! Transport, protocol and session failures all surface as [`ApiError`].
//! Per-record transform failures and unresolved relationships are not
//! errors at this level; see `crate::sync`.

use std::fmt;

/// Maximum number of response body characters kept for diagnostics
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors raised by the legacy API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure (DNS, refused connection, timeout)
    Connection(String),
    /// The remote host is categorically down
    ServerUnavailable(String),
    /// Non-success HTTP status
    Response { status: u16, body: String },
    /// Response body did not have the expected structure
    Data(String),
    /// Authentication failed or no session could be established
    Session(String),
    /// Client misconfiguration (unknown environment, bad page size, ...)
    Configuration(String),
    /// Every filter term was malformed and `fail_on_filter_error` is set
    Filter(String),
}

impl ApiError {
    /// Build a response error, truncating the body
    pub fn response(status: u16, body: &str) -> Self {
        ApiError::Response {
            status,
            body: truncate_body(body),
        }
    }

    /// Whether the error says the server cannot be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::ServerUnavailable(_))
    }

    /// HTTP status code, for response errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Connection(msg) => write!(f, "connection error: {}", msg),
            ApiError::ServerUnavailable(msg) => write!(f, "server unavailable: {}", msg),
            ApiError::Response { status, body } => write!(f, "HTTP {}: {}", status, body),
            ApiError::Data(msg) => write!(f, "unexpected response data: {}", msg),
            ApiError::Session(msg) => write!(f, "session error: {}", msg),
            ApiError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            ApiError::Filter(msg) => write!(f, "filter error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Connection(err.to_string())
        } else if err.is_connect() {
            ApiError::ServerUnavailable(err.to_string())
        } else if err.is_decode() {
            ApiError::Data(err.to_string())
        } else {
            ApiError::Connection(err.to_string())
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    truncated.push_str("...");
    truncated
}
