//! Error types for the tracking pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions. None of these errors
//! ever cross back into the wrapped call's path: extraction errors are
//! swallowed and logged by the proxy, tracker errors stay inside the tracker.

use thiserror::Error;

/// Failures inside the background tracker and its delivery sink.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Usage API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error delivering usage record: {0}")]
    Network(String),
}

/// Failures while extracting usage data from a call result.
///
/// Returned by extractors and consumed by the proxy with a log-and-continue
/// policy; the primary call never sees these.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Result had unexpected type for {method}")]
    UnexpectedResultType { method: String },

    #[error("Malformed result shape: {0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_error_displays_status() {
        let err = TrackerError::Api {
            status_code: 503,
            message: "unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn tracker_error_network_display() {
        let err = TrackerError::Network("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn extract_error_names_method() {
        let err = ExtractError::UnexpectedResultType {
            method: "messages.create".into(),
        };
        assert!(err.to_string().contains("messages.create"));
    }
}
