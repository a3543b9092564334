//! Resilient backend invocation with bounded exponential backoff.
//!
//! This is the only place a backend failure turns into a [`JudgeError`].
//! A reply that arrives but is not usable structured data is still a
//! success from this client's point of view.

use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::{ChatBackend, ChatMessage, DecodingOptions};
use crate::config::{RetryConfig, DEFAULT_BACKOFF_UNIT_MS, DEFAULT_MAX_ATTEMPTS};
use crate::error::{JudgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    /// The wait after failed attempt `n` (zero-indexed) is `2^n` units
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_unit: config.backoff_unit(),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

pub struct InferenceClient<B> {
    backend: B,
    model: String,
    policy: RetryPolicy,
}

impl<B: ChatBackend> InferenceClient<B> {
    pub fn new(backend: B, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            model: model.into(),
            policy,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send `messages` to the backend, retrying failed calls.
    ///
    /// Returns the trimmed reply text, or [`JudgeError::Backend`] once every
    /// attempt has failed.
    pub async fn invoke(&self, messages: &[ChatMessage], options: &DecodingOptions) -> Result<String> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.backend.chat(&self.model, messages, options).await {
                Ok(reply) => {
                    debug!(model = %self.model, attempt = attempt + 1, chars = reply.len(), "backend replied");
                    return Ok(reply.trim().to_string());
                }
                Err(failure) if attempt + 1 >= attempts => {
                    warn!(model = %self.model, attempt = attempt + 1, error = %failure, "backend attempt failed; giving up");
                    return Err(JudgeError::Backend {
                        attempts,
                        message: failure.to_string(),
                    });
                }
                Err(failure) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        model = %self.model,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "backend attempt failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_unit: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_from_config_never_zero_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            backoff_unit_ms: 5,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff_unit, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_success_first_try_is_trimmed() {
        let client = InferenceClient::new(MockBackend::always("  {\"a\": 1}\n"), "m", fast_policy(3));
        let reply = client.invoke(&[], &DecodingOptions::ANALYSIS).await.unwrap();
        assert_eq!(reply, "{\"a\": 1}");
        assert_eq!(client.backend().call_count(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let mock = MockBackend::new();
        mock.push_failure("connection reset");
        mock.push_failure("connection reset");
        mock.push_reply("ok");

        let client = InferenceClient::new(mock, "m", fast_policy(3));
        let reply = client.invoke(&[], &DecodingOptions::ANALYSIS).await.unwrap();

        assert_eq!(reply, "ok");
        assert_eq!(client.backend().call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_fatal() {
        let client = InferenceClient::new(MockBackend::unavailable("refused"), "m", fast_policy(3));
        let err = client.invoke(&[], &DecodingOptions::ANALYSIS).await.unwrap_err();

        assert!(err.is_backend());
        assert!(err.to_string().contains("after 3 attempt(s)"));
        assert!(err.to_string().contains("refused"));
        assert_eq!(client.backend().call_count(), 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_not_retried() {
        let client = InferenceClient::new(MockBackend::always("not json at all"), "m", fast_policy(3));
        let reply = client.invoke(&[], &DecodingOptions::ANALYSIS).await.unwrap();
        assert_eq!(reply, "not json at all");
        assert_eq!(client.backend().call_count(), 1);
    }

    #[tokio::test]
    async fn test_options_and_model_threaded_through() {
        let client = InferenceClient::new(MockBackend::always("{}"), "codellama:13b-instruct", fast_policy(1));
        client
            .invoke(&[ChatMessage::user("x")], &DecodingOptions::CODE_UNDERSTANDING)
            .await
            .unwrap();

        let calls = client.backend().calls();
        assert_eq!(calls[0].model, "codellama:13b-instruct");
        assert_eq!(calls[0].options, DecodingOptions::CODE_UNDERSTANDING);
    }
}
