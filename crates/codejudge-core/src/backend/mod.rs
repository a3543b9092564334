//! Inference backend capability.
//!
//! The backend is a black box that turns a message list plus decoding
//! options into text. Any reply that arrives is a success here, whether or
//! not its content is usable JSON; recovering structure is the extractor's
//! job.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpBackend;
pub use mock::MockBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters, fixed per call site and passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub repeat_penalty: Option<f64>,
}

impl DecodingOptions {
    /// Low-randomness settings shared by the analysis stages
    pub const ANALYSIS: DecodingOptions = DecodingOptions {
        temperature: 0.1,
        top_p: 0.8,
        max_tokens: 4096,
        repeat_penalty: Some(1.1),
    };

    /// Code understanding gets a little more room to explore
    pub const CODE_UNDERSTANDING: DecodingOptions = DecodingOptions {
        temperature: 0.2,
        ..Self::ANALYSIS
    };

    pub const TEST_GENERATION: DecodingOptions = DecodingOptions {
        temperature: 0.3,
        top_p: 0.9,
        max_tokens: 2048,
        repeat_penalty: None,
    };
}

/// A single failed backend call. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend reply: {0}")]
    Envelope(String),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &DecodingOptions,
    ) -> Result<String, BackendFailure>;
}

#[async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<B> {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &DecodingOptions,
    ) -> Result<String, BackendFailure> {
        (**self).chat(model, messages, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::system("be terse")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "be terse"}));
    }

    #[test]
    fn test_code_understanding_only_differs_in_temperature() {
        let cu = DecodingOptions::CODE_UNDERSTANDING;
        let an = DecodingOptions::ANALYSIS;
        assert!(cu.temperature > an.temperature);
        assert_eq!(cu.top_p, an.top_p);
        assert_eq!(cu.max_tokens, an.max_tokens);
        assert_eq!(cu.repeat_penalty, an.repeat_penalty);
    }
}
