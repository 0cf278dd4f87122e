//! Usage records and per-call context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ErrorDetails;

/// One normalized telemetry row describing a tracked invocation.
///
/// Built through [`UsageRecord::success`] or [`UsageRecord::failure`], which
/// keep the shape consistent: a failure record always carries zero token
/// counts and no result-derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Customer / tenant attribution (None when no id was resolvable).
    pub customer_id: Option<String>,
    /// Model the call targeted (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    /// Input tokens consumed.
    pub input_tokens: u32,
    /// Output tokens produced.
    pub output_tokens: u32,
    /// Provider tag, constant per proxy (e.g. "anthropic").
    pub provider: String,
    /// Arbitrary response metadata (response id, role, stop reason, ...).
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Whether the wrapped call failed.
    pub error_occurred: bool,
    /// Classified error type (snake_case, see `ErrorKind`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Numeric status code as a string, when one was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider-issued request id, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// When the wrapped call started.
    pub request_start_time: DateTime<Utc>,
    /// When the wrapped call returned (or failed).
    pub request_end_time: DateTime<Utc>,
}

impl UsageRecord {
    /// Record for a call that completed normally.
    pub fn success(
        customer_id: Option<String>,
        model: impl Into<String>,
        input_tokens: u32,
        output_tokens: u32,
        provider: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
        ctx: &CallContext,
    ) -> Self {
        Self {
            customer_id,
            model: model.into(),
            input_tokens,
            output_tokens,
            provider: provider.into(),
            metadata,
            error_occurred: false,
            error_type: None,
            error_code: None,
            error_message: None,
            request_id: ctx.request_id.clone(),
            request_start_time: ctx.started_at,
            request_end_time: ctx.ended_at,
        }
    }

    /// Record for a call that raised. Token counts are zero and metadata is
    /// empty: there is no result to derive them from.
    pub fn failure(
        customer_id: Option<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
        details: &ErrorDetails,
        ctx: &CallContext,
    ) -> Self {
        Self {
            customer_id,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            provider: provider.into(),
            metadata: serde_json::Map::new(),
            error_occurred: true,
            error_type: Some(details.kind.to_string()),
            error_code: details.code.clone(),
            error_message: Some(details.message.clone()),
            request_id: details.request_id.clone().or_else(|| ctx.request_id.clone()),
            request_start_time: ctx.started_at,
            request_end_time: ctx.ended_at,
        }
    }

    /// Wall-clock duration of the wrapped call in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.request_end_time
            .signed_duration_since(self.request_start_time)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Ephemeral per-invocation value handed to the extractor.
///
/// Created at call entry by the proxy, consumed by the extractor, then
/// discarded. `params` holds the call metadata that survives the strip of
/// tracking-only arguments (typically the `model`).
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Dotted method path (e.g. "messages.create").
    pub method: String,
    /// Provider tag of the owning proxy.
    pub provider: String,
    /// Call parameters relevant to telemetry, post tracking-argument strip.
    pub params: serde_json::Map<String, serde_json::Value>,
    /// When the wrapped call was invoked.
    pub started_at: DateTime<Utc>,
    /// When the wrapped call returned.
    pub ended_at: DateTime<Utc>,
    /// Request id, when the caller supplied one up front.
    pub request_id: Option<String>,
}

impl CallContext {
    /// Read a string-valued call parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}
