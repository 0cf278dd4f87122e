//! Delivery sinks for usage records.

use async_trait::async_trait;
use clawmeter_core::{TrackerError, UsageRecord};

/// Where usage records end up.
///
/// The tracker's worker is the only caller; implementations report failures
/// as errors and the worker decides what to do with them (log and count —
/// delivery is best-effort, there is no retry queue).
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Deliver a single record.
    async fn deliver(&self, record: &UsageRecord) -> Result<(), TrackerError>;
}

/// HTTP sink posting records to the usage API.
pub struct HttpSink {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl HttpSink {
    /// Create a sink for the given API key and base URL.
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            endpoint: format!("{}/api/events", api_url.into().trim_end_matches('/')),
        }
    }

    /// The endpoint records are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn deliver(&self, record: &UsageRecord) -> Result<(), TrackerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(record)
            .send()
            .await
            .map_err(|e| TrackerError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Api {
                status_code: status,
                message: body,
            });
        }

        Ok(())
    }
}
