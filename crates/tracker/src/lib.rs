//! Background usage tracker — accepts records and ships them to a sink
//! without ever touching the caller's control flow.
//!
//! [`UsageTracker::submit`] is synchronous and non-blocking: it hands the
//! record to a bounded queue and returns. A worker task drains the queue and
//! delivers through a [`RecordSink`]. Every failure mode (full queue, sink
//! down) is absorbed here: logged, counted, and — if
//! the embedder registered one — reported through a callback. Nothing
//! propagates back to whoever submitted.

pub mod sink;

pub use sink::{HttpSink, RecordSink};

use clawmeter_core::{TrackerError, UsageRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default bound on the in-flight record queue. Overflow drops records.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Callback invoked on each delivery failure (advisory; defaults to none).
pub type FailureCallback = Box<dyn Fn(&TrackerError) + Send + Sync>;

enum Command {
    Record(Box<UsageRecord>),
    Shutdown,
}

/// Asynchronous, best-effort usage tracker.
///
/// Safe for concurrent submission from any number of proxies; share it with
/// an `Arc`. Records are delivered at most once and may be dropped under
/// backpressure or sink failure — by contract that is an accepted loss.
pub struct UsageTracker {
    tx: mpsc::Sender<Command>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    dropped: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    on_failure: Arc<std::sync::Mutex<Option<FailureCallback>>>,
}

impl UsageTracker {
    /// Tracker posting to the usage API with the given credentials.
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self::with_sink(
            Arc::new(HttpSink::new(api_key, api_url)),
            DEFAULT_QUEUE_CAPACITY,
        )
    }

    /// Tracker with a custom sink and queue capacity.
    pub fn with_sink(sink: Arc<dyn RecordSink>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let failures = Arc::new(AtomicU64::new(0));
        let on_failure: Arc<std::sync::Mutex<Option<FailureCallback>>> =
            Arc::new(std::sync::Mutex::new(None));

        let worker = tokio::spawn(Self::run_worker(
            rx,
            sink,
            Arc::clone(&failures),
            Arc::clone(&on_failure),
        ));

        Self {
            tx,
            worker: std::sync::Mutex::new(Some(worker)),
            dropped: Arc::new(AtomicU64::new(0)),
            failures,
            on_failure,
        }
    }

    /// Queue a record for delivery. Never blocks, never fails to the caller:
    /// a full or closed queue drops the record with a warning.
    pub fn submit(&self, record: UsageRecord) {
        match self.tx.try_send(Command::Record(Box::new(record))) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Usage queue full, dropping record");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Usage tracker is shut down, dropping record");
            }
        }
    }

    /// Records dropped before delivery (queue full or tracker shut down).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records the sink failed to deliver.
    pub fn delivery_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Register a callback fired on each delivery failure. Advisory only;
    /// delivery stays best-effort either way.
    pub fn on_delivery_failure(&self, callback: FailureCallback) {
        *self.on_failure.lock().unwrap() = Some(callback);
    }

    /// Flush queued records and stop the worker, waiting at most `timeout`.
    /// Records still queued past the deadline are lost, by contract.
    pub async fn shutdown(&self, timeout: std::time::Duration) {
        if self.tx.try_send(Command::Shutdown).is_err() {
            return;
        }
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("Usage tracker worker did not stop in time, abandoning it");
            }
        }
    }

    async fn run_worker(
        mut rx: mpsc::Receiver<Command>,
        sink: Arc<dyn RecordSink>,
        failures: Arc<AtomicU64>,
        on_failure: Arc<std::sync::Mutex<Option<FailureCallback>>>,
    ) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Record(record) => {
                    if let Err(e) = sink.deliver(&record).await {
                        failures.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Failed to deliver usage record");
                        if let Some(cb) = on_failure.lock().unwrap().as_ref() {
                            cb(&e);
                        }
                    } else {
                        debug!(
                            model = %record.model,
                            provider = %record.provider,
                            "Delivered usage record"
                        );
                    }
                }
                Command::Shutdown => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawmeter_core::CallContext;
    use std::sync::Mutex;

    fn record(model: &str) -> UsageRecord {
        let now = chrono::Utc::now();
        let ctx = CallContext {
            method: "messages.create".into(),
            provider: "anthropic".into(),
            params: serde_json::Map::new(),
            started_at: now,
            ended_at: now,
            request_id: None,
        };
        UsageRecord::success(None, model, 1, 2, "anthropic", serde_json::Map::new(), &ctx)
    }

    /// Sink that remembers everything it was given.
    struct MemorySink {
        records: Mutex<Vec<UsageRecord>>,
    }

    impl MemorySink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl RecordSink for MemorySink {
        async fn deliver(&self, record: &UsageRecord) -> Result<(), TrackerError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Sink that always fails.
    struct FailingSink;

    #[async_trait::async_trait]
    impl RecordSink for FailingSink {
        async fn deliver(&self, _record: &UsageRecord) -> Result<(), TrackerError> {
            Err(TrackerError::Api {
                status_code: 503,
                message: "unavailable".into(),
            })
        }
    }

    /// Sink that blocks forever, so the queue backs up.
    struct StuckSink;

    #[async_trait::async_trait]
    impl RecordSink for StuckSink {
        async fn deliver(&self, _record: &UsageRecord) -> Result<(), TrackerError> {
            futures_never().await;
            Ok(())
        }
    }

    async fn futures_never() {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }

    #[tokio::test]
    async fn submit_delivers_through_sink() {
        let sink = MemorySink::new();
        let tracker = UsageTracker::with_sink(sink.clone(), 16);

        tracker.submit(record("claude-sonnet-4-20250514"));
        tracker.submit(record("claude-sonnet-4-20250514"));
        tracker.shutdown(std::time::Duration::from_secs(1)).await;

        let delivered = sink.records.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].model, "claude-sonnet-4-20250514");
    }

    #[tokio::test]
    async fn sink_failure_is_counted_not_raised() {
        let tracker = UsageTracker::with_sink(Arc::new(FailingSink), 16);

        tracker.submit(record("m"));
        tracker.submit(record("m"));
        tracker.shutdown(std::time::Duration::from_secs(1)).await;

        assert_eq!(tracker.delivery_failures(), 2);
        assert_eq!(tracker.dropped(), 0);
    }

    #[tokio::test]
    async fn failure_callback_fires() {
        let tracker = UsageTracker::with_sink(Arc::new(FailingSink), 16);
        let seen = Arc::new(AtomicU64::new(0));
        let seen_cb = Arc::clone(&seen);
        tracker.on_delivery_failure(Box::new(move |_err| {
            seen_cb.fetch_add(1, Ordering::Relaxed);
        }));

        tracker.submit(record("m"));
        tracker.shutdown(std::time::Duration::from_secs(1)).await;

        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let tracker = UsageTracker::with_sink(Arc::new(StuckSink), 1);

        // First record is picked up by the worker and gets stuck in deliver.
        tracker.submit(record("a"));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // One slot in the queue, everything past it is dropped.
        tracker.submit(record("b"));
        tracker.submit(record("c"));
        tracker.submit(record("d"));

        assert!(tracker.dropped() >= 2);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_silent() {
        let sink = MemorySink::new();
        let tracker = UsageTracker::with_sink(sink.clone(), 16);
        tracker.shutdown(std::time::Duration::from_secs(1)).await;

        // Must not panic or error; the record is simply lost.
        for _ in 0..20 {
            tracker.submit(record("late"));
        }
        assert!(tracker.dropped() > 0);
    }
}
