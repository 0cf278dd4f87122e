//! Core domain types for Clawmeter usage tracking.
//!
//! This crate holds the pieces everything else builds on: the normalized
//! [`UsageRecord`] emitted for every tracked call, the per-invocation
//! [`CallContext`], and the error classifier that maps arbitrary provider
//! failures onto a small, stable taxonomy.

pub mod classify;
pub mod error;
pub mod record;

pub use classify::{ErrorContext, ErrorDetails, ErrorKind, classify, classify_status};
pub use error::{ExtractError, TrackerError};
pub use record::{CallContext, UsageRecord};
