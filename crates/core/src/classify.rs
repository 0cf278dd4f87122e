//! Error classification for failed provider calls.
//!
//! Maps an arbitrary raised error onto a small, stable taxonomy so the usage
//! sink sees consistent `error_type` / `error_code` values regardless of which
//! client library produced the failure. Classification is total: anything
//! unrecognized degrades to [`ErrorKind::Unknown`], never to a panic.

use serde::{Deserialize, Serialize};

/// The normalized category of a failed call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 401 / 403, or an auth-shaped message.
    Authentication,
    /// 429.
    RateLimit,
    /// Other 4xx.
    InvalidRequest,
    /// 5xx.
    ServerError,
    /// Transport-level failure (timeout, connection refused, DNS, ...).
    NetworkError,
    /// Anything we could not categorize.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::ServerError => write!(f, "server_error"),
            Self::NetworkError => write!(f, "network_error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify by HTTP status code alone.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Authentication,
        429 => ErrorKind::RateLimit,
        500..=599 => ErrorKind::ServerError,
        400..=499 => ErrorKind::InvalidRequest,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a failure, preferring the status code and falling back to
/// message inspection when none is available.
pub fn classify(status: Option<u16>, message: &str) -> ErrorKind {
    if let Some(code) = status {
        return classify_status(code);
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("dns")
    {
        ErrorKind::NetworkError
    } else if lower.contains("api key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        ErrorKind::Authentication
    } else if lower.contains("rate limit") {
        ErrorKind::RateLimit
    } else {
        ErrorKind::Unknown
    }
}

/// Implemented by client error types so the proxy can classify them without
/// knowing their concrete shape.
pub trait ErrorContext {
    /// HTTP status code, when the failure carried one.
    fn status(&self) -> Option<u16>;
    /// Human-readable description of the failure.
    fn message(&self) -> String;
    /// Provider-issued request id, when one made it back.
    fn request_id(&self) -> Option<String> {
        None
    }
}

/// The normalized classification of one failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Categorized error type.
    pub kind: ErrorKind,
    /// Decimal status string ("500") when a status was present.
    pub code: Option<String>,
    /// Original error message.
    pub message: String,
    /// Request id, when known.
    pub request_id: Option<String>,
}

impl ErrorDetails {
    /// Build details from any error exposing [`ErrorContext`].
    pub fn from_error<E: ErrorContext>(err: &E) -> Self {
        let status = err.status();
        let message = err.message();
        Self {
            kind: classify(status, &message),
            code: status.map(|s| s.to_string()),
            message,
            request_id: err.request_id(),
        }
    }
}
