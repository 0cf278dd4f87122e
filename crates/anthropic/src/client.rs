//! Minimal Anthropic Messages API client.
//!
//! Only the surface the tracking layer needs to wrap:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - non-streaming `messages.create` with typed usage in the response
//!
//! Streaming, tool use, and the rest of the API are out of scope here; the
//! proxy layer is client-shape-agnostic, so a fuller client slots in the
//! same way.

use clawmeter_core::ErrorContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Errors from the Anthropic API or the transport underneath it.
#[derive(Debug, Clone, Error)]
pub enum AnthropicError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api {
        status_code: u16,
        message: String,
        request_id: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),
}

impl ErrorContext for AnthropicError {
    fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            Self::Network(_) => None,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }

    fn request_id(&self) -> Option<String> {
        match self {
            Self::Api { request_id, .. } => request_id.clone(),
            Self::Network(_) => None,
        }
    }
}

/// Anthropic native Messages API client.
#[derive(Clone)]
pub struct Anthropic {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Anthropic {
    /// Create a client for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Use a custom base URL (e.g. for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `messages` sub-resource.
    pub fn messages(&self) -> Messages {
        Messages {
            http: self.http.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// The `messages` namespace of the API.
#[derive(Debug, Clone)]
pub struct Messages {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Messages {
    /// Send a completion request and return the full response.
    pub async fn create(&self, request: MessagesRequest) -> Result<MessagesResponse, AnthropicError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %request.model, "Sending messages.create request");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnthropicError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(AnthropicError::Api {
                status_code: status,
                message,
                request_id,
            });
        }

        response.json().await.map_err(|e| AnthropicError::Api {
            status_code: 200,
            message: format!("Failed to parse Anthropic response: {e}"),
            request_id,
        })
    }
}

/// A request to `messages.create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl MessagesRequest {
    /// Request with the given model and a single user message.
    pub fn user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: content.into(),
            }],
            system: None,
            temperature: None,
            stop_sequences: Vec::new(),
        }
    }
}

/// One conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A `messages.create` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub model: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    /// Token accounting. Absent on partial/streaming shapes, in which case
    /// no usage record is emitted for the call.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl MessagesResponse {
    /// Concatenated text of all text content blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A response content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_defaults() {
        let client = Anthropic::new("sk-ant-test");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let client = Anthropic::new("sk-ant-test").with_base_url("https://proxy.example.com/");
        assert_eq!(client.base_url(), "https://proxy.example.com");
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = Anthropic::new("sk-ant-supersecret");
        let repr = format!("{client:?}");
        assert!(!repr.contains("supersecret"));
        assert!(repr.contains("[REDACTED]"));
    }

    #[test]
    fn parse_response_with_usage() {
        let resp: MessagesResponse = serde_json::from_str(
            r#"{
                "id": "msg_123",
                "type": "message",
                "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "Hello!"}],
                "stop_reason": "end_turn",
                "stop_sequence": null,
                "usage": {"input_tokens": 10, "output_tokens": 20}
            }"#,
        )
        .unwrap();

        assert_eq!(resp.id, "msg_123");
        assert_eq!(resp.text(), "Hello!");
        let usage = resp.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 20);
    }

    #[test]
    fn parse_response_without_usage() {
        let resp: MessagesResponse = serde_json::from_str(
            r#"{
                "id": "msg_partial",
                "type": "message",
                "role": "assistant",
                "model": "claude-sonnet-4-20250514",
                "content": []
            }"#,
        )
        .unwrap();

        assert!(resp.usage.is_none());
        assert!(resp.stop_reason.is_none());
    }

    #[test]
    fn request_serialization_skips_absent_fields() {
        let request = MessagesRequest::user("claude-sonnet-4-20250514", "hi");
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("claude-sonnet-4-20250514"));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("stop_sequences"));
        assert!(!json.contains("system"));
    }

    #[test]
    fn error_context_for_api_error() {
        let err = AnthropicError::Api {
            status_code: 429,
            message: "rate limited".into(),
            request_id: Some("req_1".into()),
        };
        assert_eq!(err.status(), Some(429));
        assert!(err.message().contains("rate limited"));
        assert_eq!(err.request_id().as_deref(), Some("req_1"));
    }

    #[test]
    fn error_context_for_network_error() {
        let err = AnthropicError::Network("connection refused".into());
        assert_eq!(err.status(), None);
        assert!(err.message().contains("connection refused"));
        assert_eq!(err.request_id(), None);
    }
}
