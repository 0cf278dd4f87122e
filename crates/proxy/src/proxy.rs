//! The tracked proxy itself.

use crate::extractor::CallOutcome;
use crate::registry::MethodRegistry;
use chrono::Utc;
use clawmeter_core::{CallContext, ErrorContext, ErrorDetails};
use clawmeter_tracker::UsageTracker;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;

/// Tracking-only parameters for one call.
///
/// These never become part of the real request: the customer id and the
/// tracking flag exist only for the telemetry side, and `params` carries the
/// request metadata (typically the `model`) the extractor needs when the call
/// fails and there is no response to read it from.
#[derive(Debug, Clone)]
pub struct CallOptions {
    customer_id: Option<String>,
    track_usage: bool,
    params: serde_json::Map<String, serde_json::Value>,
    request_id: Option<String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            customer_id: None,
            track_usage: true,
            params: serde_json::Map::new(),
            request_id: None,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute this call to a customer.
    pub fn customer_id(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    /// Enable or disable tracking for this call (default: enabled). The
    /// wrapped call proceeds identically either way.
    pub fn track_usage(mut self, enabled: bool) -> Self {
        self.track_usage = enabled;
        self
    }

    /// Attach a call parameter for the extractor (e.g. the model name).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Attach a caller-chosen request id carried into the record.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Wraps a client and emits usage telemetry for registered method paths.
///
/// The proxy owns its registry and shares the client and tracker. Members it
/// does not intercept are reachable through `Deref`, so a `TrackedProxy<C>`
/// can be used anywhere a `&C` can — with exactly the raw client's behavior.
pub struct TrackedProxy<C> {
    client: Arc<C>,
    tracker: Arc<UsageTracker>,
    registry: Arc<MethodRegistry>,
    provider: String,
    /// Dotted path from the root proxy to this one ("" at the root).
    prefix: String,
}

impl<C> TrackedProxy<C> {
    /// Wrap `client`, tracking the paths in `registry` with the given
    /// provider tag.
    pub fn new(
        client: Arc<C>,
        tracker: Arc<UsageTracker>,
        registry: MethodRegistry,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tracker,
            registry: Arc::new(registry),
            provider: provider.into(),
            prefix: String::new(),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// The tracker records are submitted to.
    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Whether calls to this method (relative to this proxy) are tracked.
    pub fn is_tracked(&self, method: &str) -> bool {
        self.registry.get(method).is_some()
    }

    /// Whether a nested proxy for this segment would intercept anything.
    pub fn has_tracked_namespace(&self, segment: &str) -> bool {
        self.registry.has_root(segment)
    }

    /// Proxy for a sub-resource, carrying the path-suffix subset of the
    /// registry. Built lazily by typed wrappers when a namespace is entered.
    pub fn scoped<S>(&self, segment: &str, sub: Arc<S>) -> TrackedProxy<S> {
        TrackedProxy {
            client: sub,
            tracker: Arc::clone(&self.tracker),
            registry: Arc::new(self.registry.scoped(segment)),
            provider: self.provider.clone(),
            prefix: if self.prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{}.{segment}", self.prefix)
            },
        }
    }

    fn full_path(&self, method: &str) -> String {
        if self.prefix.is_empty() {
            method.to_string()
        } else {
            format!("{}.{method}", self.prefix)
        }
    }

    /// Invoke a method through the interception layer.
    ///
    /// `f` performs the real call and receives nothing from the tracking
    /// side; its result — success or failure — is returned to the caller
    /// unchanged, no matter what extraction or submission do. For methods
    /// not in the registry (or with tracking disabled) this is a plain
    /// `f().await`.
    pub async fn call<T, E, F, Fut>(&self, method: &str, options: CallOptions, f: F) -> Result<T, E>
    where
        T: Any,
        E: ErrorContext,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let extractor = if options.track_usage {
            self.registry.get(method)
        } else {
            None
        };

        let Some(extractor) = extractor else {
            return f().await;
        };

        let started_at = Utc::now();
        let result = f().await;
        let ended_at = Utc::now();

        let ctx = CallContext {
            method: self.full_path(method),
            provider: self.provider.clone(),
            params: options.params,
            started_at,
            ended_at,
            request_id: options.request_id,
        };

        let extraction = match &result {
            Ok(value) => extractor.record(
                CallOutcome::Success(value as &dyn Any),
                options.customer_id.as_deref(),
                &ctx,
                &self.tracker,
            ),
            Err(err) => {
                let details = ErrorDetails::from_error(err);
                extractor.record(
                    CallOutcome::Failure(&details),
                    options.customer_id.as_deref(),
                    &ctx,
                    &self.tracker,
                )
            }
        };

        if let Err(e) = extraction {
            warn!(method = %ctx.method, error = %e, "Usage extraction failed; call unaffected");
        }

        result
    }
}

impl<C> std::ops::Deref for TrackedProxy<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.client
    }
}

impl<C> Clone for TrackedProxy<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            tracker: Arc::clone(&self.tracker),
            registry: Arc::clone(&self.registry),
            provider: self.provider.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for TrackedProxy<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedProxy")
            .field("provider", &self.provider)
            .field("tracked_paths", &self.registry.paths())
            .field("client", &self.client)
            .finish()
    }
}
