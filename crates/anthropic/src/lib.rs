//! Tracked Anthropic integration.
//!
//! A minimal native Messages API client plus the tracking glue:
//! [`TrackedAnthropic`] wraps the client in a [`clawmeter_proxy::TrackedProxy`]
//! with `messages.create` registered, so every completion call emits a usage
//! record while behaving exactly like the raw client.

pub mod client;
pub mod compat;
pub mod extract;
pub mod tracked;

pub use client::{
    Anthropic, AnthropicError, ChatMessage, Messages, MessagesRequest, MessagesResponse, Usage,
};
pub use compat::{SupportLevel, check_sdk_version, compatibility_info};
pub use extract::MessagesCreateExtractor;
pub use tracked::{PROVIDER, TrackedAnthropic, TrackedMessages, anthropic_tracked_methods};
