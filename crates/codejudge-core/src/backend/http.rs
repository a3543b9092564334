//! HTTP inference backend.
//!
//! Speaks either the Ollama chat API or an OpenAI-compatible chat
//! completions API, selected by [`BackendKind`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{BackendFailure, ChatBackend, ChatMessage, DecodingOptions};
use crate::config::{BackendConfig, BackendKind};
use crate::error::{JudgeError, Result};

pub struct HttpBackend {
    client: Client,
    kind: BackendKind,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(
        kind: BackendKind,
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JudgeError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build from configuration; the OpenAI dialect reads its key from the
    /// configured environment variable.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let api_key = match config.kind {
            BackendKind::Ollama => None,
            BackendKind::OpenAi => std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.is_empty()),
        };

        Self::new(
            config.kind,
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            api_key,
        )
    }

    fn endpoint(&self) -> String {
        match self.kind {
            BackendKind::Ollama => format!("{}/api/chat", self.base_url),
            BackendKind::OpenAi => format!("{}/v1/chat/completions", self.base_url),
        }
    }

    fn request_body(&self, model: &str, messages: &[ChatMessage], options: &DecodingOptions) -> Value {
        match self.kind {
            BackendKind::Ollama => {
                let mut sampling = json!({
                    "temperature": options.temperature,
                    "top_p": options.top_p,
                    "num_predict": options.max_tokens,
                });
                if let Some(penalty) = options.repeat_penalty {
                    sampling["repeat_penalty"] = json!(penalty);
                }
                json!({
                    "model": model,
                    "messages": messages,
                    "stream": false,
                    "options": sampling,
                })
            }
            BackendKind::OpenAi => json!({
                "model": model,
                "messages": messages,
                "temperature": options.temperature,
                "top_p": options.top_p,
                "max_tokens": options.max_tokens,
            }),
        }
    }

    fn reply_content(&self, reply: &Value) -> Option<String> {
        let content = match self.kind {
            BackendKind::Ollama => reply.get("message").and_then(|m| m.get("content")),
            BackendKind::OpenAi => reply
                .get("choices")
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.first())
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content")),
        };
        content.and_then(|c| c.as_str()).map(str::to_string)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &DecodingOptions,
    ) -> std::result::Result<String, BackendFailure> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(model, messages, options));

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendFailure::Status { status, body });
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| BackendFailure::Envelope(e.to_string()))?;

        self.reply_content(&reply)
            .ok_or_else(|| BackendFailure::Envelope("reply has no message content".to_string()))
    }
}
