//! The extractor seam between the proxy and the tracker.

use clawmeter_core::{CallContext, ErrorDetails, ExtractError};
use clawmeter_tracker::UsageTracker;
use std::any::Any;

/// What a tracked call produced, with the result type erased.
///
/// On success the original result is passed as `&dyn Any`; the extractor
/// downcasts to the concrete response type it understands. A failed downcast
/// is an [`ExtractError`], not a panic — extractors are expected to be
/// defensive about shapes they do not recognize.
pub enum CallOutcome<'a> {
    /// The wrapped call returned normally.
    Success(&'a dyn Any),
    /// The wrapped call raised; details are already classified.
    Failure(&'a ErrorDetails),
}

impl<'a> CallOutcome<'a> {
    /// Downcast a successful result to a concrete type.
    pub fn result<T: Any>(&self) -> Option<&'a T> {
        match self {
            Self::Success(value) => value.downcast_ref::<T>(),
            Self::Failure(_) => None,
        }
    }

    /// Error details when the call failed.
    pub fn error(&self) -> Option<&'a ErrorDetails> {
        match self {
            Self::Success(_) => None,
            Self::Failure(details) => Some(details),
        }
    }
}

/// Turns one call outcome into zero or one usage records.
///
/// Implementations decide whether to submit (a result without usage data is a
/// deliberate no-op) and must never reach into the primary call path: the
/// returned error is logged by the proxy and discarded.
pub trait UsageExtractor: Send + Sync {
    /// Inspect the outcome and, when appropriate, submit a record through
    /// `tracker`. `customer_id` is the id the caller supplied at call time,
    /// if any; extractors fall back to the ambient customer context.
    fn record(
        &self,
        outcome: CallOutcome<'_>,
        customer_id: Option<&str>,
        ctx: &CallContext,
        tracker: &UsageTracker,
    ) -> Result<(), ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmeter_core::ErrorKind;

    #[test]
    fn downcast_success() {
        let value: u32 = 7;
        let outcome = CallOutcome::Success(&value);
        assert_eq!(outcome.result::<u32>(), Some(&7));
        assert_eq!(outcome.result::<String>(), None);
        assert!(outcome.error().is_none());
    }

    #[test]
    fn failure_exposes_details() {
        let details = ErrorDetails {
            kind: ErrorKind::RateLimit,
            code: Some("429".into()),
            message: "slow down".into(),
            request_id: None,
        };
        let outcome = CallOutcome::Failure(&details);
        assert!(outcome.result::<u32>().is_none());
        assert_eq!(outcome.error().unwrap().kind, ErrorKind::RateLimit);
    }
}
