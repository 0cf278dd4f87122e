//! The tracked Anthropic client.

use crate::client::{Anthropic, AnthropicError, Messages, MessagesRequest, MessagesResponse};
use crate::extract::MessagesCreateExtractor;
use clawmeter_proxy::{CallOptions, MethodRegistry, TrackedProxy};
use clawmeter_tracker::UsageTracker;
use std::sync::Arc;

/// Provider tag stamped on every record from this integration.
pub const PROVIDER: &str = "anthropic";

/// The default registry for Anthropic clients: `messages.create`.
pub fn anthropic_tracked_methods() -> MethodRegistry {
    MethodRegistry::new().with("messages.create", Arc::new(MessagesCreateExtractor))
}

/// An Anthropic client with transparent usage tracking.
///
/// Derefs to [`Anthropic`], so everything not intercepted behaves exactly
/// like the raw client. Tracked namespaces are entered through their typed
/// accessors ([`TrackedAnthropic::messages`]).
#[derive(Debug, Clone)]
pub struct TrackedAnthropic {
    proxy: TrackedProxy<Anthropic>,
}

impl TrackedAnthropic {
    /// Wrap a client with the default tracked-method registry.
    pub fn new(client: Anthropic, tracker: Arc<UsageTracker>) -> Self {
        Self::with_registry(client, tracker, anthropic_tracked_methods())
    }

    /// Wrap a client with a custom registry (possibly empty).
    pub fn with_registry(
        client: Anthropic,
        tracker: Arc<UsageTracker>,
        registry: MethodRegistry,
    ) -> Self {
        Self {
            proxy: TrackedProxy::new(Arc::new(client), tracker, registry, PROVIDER),
        }
    }

    /// The `messages` namespace, with tracking applied to registered paths.
    pub fn messages(&self) -> TrackedMessages {
        let sub = Arc::new(self.proxy.inner().messages());
        TrackedMessages {
            proxy: self.proxy.scoped("messages", sub),
        }
    }

    /// The tracker records are submitted to.
    pub fn tracker(&self) -> &Arc<UsageTracker> {
        self.proxy.tracker()
    }
}

impl std::ops::Deref for TrackedAnthropic {
    type Target = Anthropic;

    fn deref(&self) -> &Anthropic {
        self.proxy.inner()
    }
}

/// Nested proxy over the `messages` sub-resource.
#[derive(Debug, Clone)]
pub struct TrackedMessages {
    proxy: TrackedProxy<Messages>,
}

impl TrackedMessages {
    /// `messages.create` with default call options (tracking on, customer
    /// attribution from the ambient context, if bound).
    pub async fn create(
        &self,
        request: MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        self.create_with(request, CallOptions::new()).await
    }

    /// `messages.create` with explicit tracking options. Tracking-only
    /// parameters never reach the API request; the model name is recorded
    /// so error records can be attributed even without a response.
    pub async fn create_with(
        &self,
        request: MessagesRequest,
        options: CallOptions,
    ) -> Result<MessagesResponse, AnthropicError> {
        let options = options.param("model", request.model.clone());
        self.proxy
            .call("create", options, || async {
                self.proxy.inner().create(request).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmeter_core::{TrackerError, UsageRecord};
    use clawmeter_tracker::RecordSink;
    use std::sync::Mutex;

    struct NullSink {
        count: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl RecordSink for NullSink {
        async fn deliver(&self, _record: &UsageRecord) -> Result<(), TrackerError> {
            *self.count.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn tracker() -> Arc<UsageTracker> {
        Arc::new(UsageTracker::with_sink(
            Arc::new(NullSink {
                count: Mutex::new(0),
            }),
            16,
        ))
    }

    #[tokio::test]
    async fn default_registry_tracks_messages_create() {
        let registry = anthropic_tracked_methods();
        assert!(registry.get("messages.create").is_some());
        assert!(registry.has_root("messages"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn untracked_members_reach_raw_client() {
        let client = Anthropic::new("sk-ant-test").with_base_url("https://proxy.local");
        let tracked = TrackedAnthropic::new(client, tracker());
        // Deref passthrough: the raw client surface is all still there.
        assert_eq!(tracked.base_url(), "https://proxy.local");
    }

    #[tokio::test]
    async fn debug_identifies_proxy_and_redacts_key() {
        let client = Anthropic::new("sk-ant-supersecret");
        let tracked = TrackedAnthropic::new(client, tracker());
        let repr = format!("{tracked:?}");
        assert!(repr.contains("TrackedProxy"));
        assert!(repr.contains("messages.create"));
        assert!(!repr.contains("supersecret"));
    }

    #[tokio::test]
    async fn empty_registry_is_pure_passthrough() {
        let client = Anthropic::new("sk-ant-test");
        let tracked = TrackedAnthropic::with_registry(client, tracker(), MethodRegistry::new());
        let repr = format!("{tracked:?}");
        assert!(repr.contains("tracked_paths: []"));
    }
}
