//! Mock provider for testing generation and grading flows.
//!
//! Replies can be scripted in order (one per call), keyed by a prompt
//! substring, or left to a default. Every prompt is recorded so tests can
//! assert how many model invocations a flow consumed.

use async_trait::async_trait;
use examprep_core::{Completion, Error, IgnoreLock as _, Result, TextGenerator};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted reply.
#[derive(Debug, Clone)]
enum ScriptedReply {
    /// Return this text
    Text(String),
    /// Fail the call with a provider error
    Failure(String),
    /// Fail the call with an error that is not worth retrying
    Rejection(String),
}

/// Mock provider that returns pre-defined responses.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Replies consumed one per call, before any other rule applies
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    /// Responses keyed by a substring of the prompt
    responses: Arc<Mutex<HashMap<String, String>>>,
    /// Default response if nothing else matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unscripted call.
    #[must_use]
    pub fn then_reply(self, response: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .push_back(ScriptedReply::Text(response.into()));
        self
    }

    /// Queue a provider failure for the next unscripted call.
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .push_back(ScriptedReply::Failure(message.into()));
        self
    }

    /// Queue a non-retryable rejection for the next unscripted call.
    #[must_use]
    pub fn then_reject(self, message: impl Into<String>) -> Self {
        self.script
            .lock_ignore_poison()
            .push_back(ScriptedReply::Rejection(message.into()));
        self
    }

    /// Queue the same reply `times` times.
    #[must_use]
    pub fn then_repeat(self, response: impl Into<String>, times: usize) -> Self {
        let response = response.into();
        {
            let mut script = self.script.lock_ignore_poison();
            for _ in 0..times {
                script.push_back(ScriptedReply::Text(response.clone()));
            }
        }
        self
    }

    /// Add a pattern-based response to the mock provider.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .lock_ignore_poison()
            .insert(pattern.into(), response.into());
        self
    }

    /// Set a default response for prompts that match nothing else.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.lock_ignore_poison() = Some(response.into());
        self
    }

    /// Get the call history (every prompt received, in order).
    #[must_use]
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Clear the call history.
    pub fn clear_history(&self) {
        self.call_history.lock_ignore_poison().clear();
    }

    /// Find a pattern response for the given prompt.
    fn find_response(&self, prompt: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();
        if let Some(response) = responses.get(prompt) {
            return Some(response.clone());
        }
        responses
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn invoke(&self, prompt: &str) -> Result<Completion> {
        self.call_history
            .lock_ignore_poison()
            .push(prompt.to_owned());

        let scripted = self.script.lock_ignore_poison().pop_front();
        let text = match scripted {
            Some(ScriptedReply::Text(text)) => text,
            Some(ScriptedReply::Failure(message)) => return Err(Error::Provider(message)),
            Some(ScriptedReply::Rejection(message)) => return Err(Error::Config(message)),
            None => self.find_response(prompt).unwrap_or_else(|| {
                self.default_response
                    .lock_ignore_poison()
                    .clone()
                    .unwrap_or_else(|| format!("Mock response for prompt: {prompt}"))
            }),
        };

        Ok(Completion::from_text(text, "mock"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let provider = MockProvider::new().then_reply("first").then_reply("second");

        assert_eq!(provider.invoke("a").await.unwrap().text, "first");
        assert_eq!(provider.invoke("b").await.unwrap().text, "second");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let provider = MockProvider::new().then_fail("rate limited").then_reply("ok");

        let error = provider.invoke("a").await.unwrap_err();
        assert!(matches!(error, Error::Provider(_)));
        assert_eq!(provider.invoke("b").await.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn test_scripted_rejection_is_not_retryable() {
        let provider = MockProvider::new().then_reject("401 Unauthorized");

        let error = provider.invoke("a").await.unwrap_err();
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn test_substring_match_after_script() {
        let provider = MockProvider::new()
            .then_reply("scripted")
            .with_response("Student's Answer", r#"{"marks": 7, "feedback": "Good."}"#);

        assert_eq!(provider.invoke("anything").await.unwrap().text, "scripted");
        let graded = provider
            .invoke("Question: x\nStudent's Answer: y")
            .await
            .unwrap();
        assert_eq!(graded.text, r#"{"marks": 7, "feedback": "Good."}"#);
    }

    #[tokio::test]
    async fn test_default_response() {
        let provider = MockProvider::new().with_default_response("Default response");

        assert_eq!(
            provider.invoke("unmatched").await.unwrap().text,
            "Default response"
        );
    }

    #[tokio::test]
    async fn test_call_history() {
        let provider = MockProvider::new().then_repeat("same", 2);

        provider.invoke("first prompt").await.unwrap();
        provider.invoke("second prompt").await.unwrap();

        let history = provider.get_call_history();
        assert_eq!(history, vec!["first prompt", "second prompt"]);

        provider.clear_history();
        assert_eq!(provider.call_count(), 0);
    }
}
