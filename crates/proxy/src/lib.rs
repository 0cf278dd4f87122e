//! Transparent call-interception proxy for AI-provider clients.
//!
//! [`TrackedProxy`] wraps an arbitrary client and intercepts the method paths
//! named in a [`MethodRegistry`]. An intercepted call runs the real client
//! method unmodified, then hands the outcome (result or classified error) to
//! the registered [`UsageExtractor`], which may emit a usage record through
//! the background tracker. The contract throughout: tracking is strictly
//! additive. The wrapped call's return value, error, and latency profile are
//! never affected by anything the telemetry side does.
//!
//! Non-tracked members of the client pass straight through via `Deref`, with
//! exactly the behavior (and missing-member failures) of the raw client.

pub mod context;
pub mod extractor;
pub mod proxy;
pub mod registry;

pub use context::{current_customer_id, with_customer_id};
pub use extractor::{CallOutcome, UsageExtractor};
pub use proxy::{CallOptions, TrackedProxy};
pub use registry::MethodRegistry;
