//! Scripted in-process backend.
//!
//! Replies are served in the order they were queued. Once the script runs
//! out, the `repeat` reply (if any) is returned for every further call;
//! otherwise the call fails as unavailable. Every call is recorded.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendFailure, ChatBackend, ChatMessage, DecodingOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: DecodingOptions,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Result<String, BackendFailure>>>,
    repeat: Option<Result<String, BackendFailure>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that answers every call with the same text
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            repeat: Some(Ok(reply.into())),
            ..Self::default()
        }
    }

    /// Backend whose every call fails
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            repeat: Some(Err(BackendFailure::Unavailable(message.into()))),
            ..Self::default()
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_script().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script()
            .push_back(Err(BackendFailure::Unavailable(message.into())));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, BackendFailure>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &DecodingOptions,
    ) -> Result<String, BackendFailure> {
        self.lock_calls().push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            options: *options,
        });

        let next = self.lock_script().pop_front();
        match next {
            Some(reply) => reply,
            None => self.repeat.clone().unwrap_or_else(|| {
                Err(BackendFailure::Unavailable(
                    "mock backend script exhausted".to_string(),
                ))
            }),
        }
    }
}
