use crate::error::{InterpError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// What a completion engine produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Generated text, not yet normalized.
    Content(String),
    /// The engine stopped without producing usable text.
    Declined { finish_reason: String },
}

/// Trait for text completion engines used to translate utterances.
///
/// This trait allows swapping implementations (hosted deployment vs mock).
pub trait TranslationEngine: Send + Sync {
    /// Complete a single-turn conversation.
    ///
    /// # Arguments
    /// * `system_prompt` - Fixed instruction describing the translation task
    /// * `user_text` - The utterance to translate, sent as the only user turn
    /// * `max_output_tokens` - Upper bound on generated length
    fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> Result<Completion>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

/// One scripted reply of the mock engine.
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Declined(String),
    /// Transient failure (retryable).
    Unavailable,
    /// Permanent failure (not retryable).
    Rejected(String),
    /// The service refuses the credential (HTTP 401).
    Unauthorized,
}

/// Mock engine for testing.
///
/// Replies are looked up by exact user text first, then taken from a queue of
/// one-shot replies, then fall back to echoing the text.
#[derive(Debug, Default)]
pub struct MockEngine {
    by_text: HashMap<String, MockReply>,
    queued: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<(String, String, u32)>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `reply` for `text`.
    pub fn with_reply(mut self, text: &str, reply: MockReply) -> Self {
        self.by_text.insert(text.to_string(), reply);
        self
    }

    /// Shorthand for a successful translation of `text`.
    pub fn with_translation(self, text: &str, translation: &str) -> Self {
        self.with_reply(text, MockReply::Content(translation.to_string()))
    }

    /// Answer the next unmatched request with `reply`.
    pub fn with_queued(self, reply: MockReply) -> Self {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(reply);
        }
        self
    }

    /// Requests seen so far as (system prompt, user text, max tokens).
    pub fn calls(&self) -> Vec<(String, String, u32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl TranslationEngine for MockEngine {
    fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> Result<Completion> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((
                system_prompt.to_string(),
                user_text.to_string(),
                max_output_tokens,
            ));
        }

        let reply = match self.by_text.get(user_text) {
            Some(reply) => Some(reply.clone()),
            None => self.queued.lock().ok().and_then(|mut q| q.pop_front()),
        };

        match reply {
            Some(MockReply::Content(text)) => Ok(Completion::Content(text)),
            Some(MockReply::Declined(reason)) => Ok(Completion::Declined {
                finish_reason: reason,
            }),
            Some(MockReply::Unavailable) => Err(InterpError::TranslationApi {
                status: 503,
                message: "mock service unavailable".to_string(),
            }),
            Some(MockReply::Rejected(message)) => {
                Err(InterpError::TranslationApi { status: 400, message })
            }
            Some(MockReply::Unauthorized) => Err(InterpError::TranslationApi {
                status: 401,
                message: "mock access denied".to_string(),
            }),
            None => Ok(Completion::Content(user_text.to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
