// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! Replies are queued per response schema name, because generation, fact
//! extraction, and summarization may run concurrently and their order is
//! not fixed. Free-text requests use the [`TEXT_KEY`] queue.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use topica_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse};
use topica_core::{PluginAdapter, ProviderAdapter, ProviderErrorKind, TopicaError};

/// Queue key for requests without a response format.
pub const TEXT_KEY: &str = "text";

const DEFAULT_TEXT: &str = "mock response";

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Error(ProviderErrorKind),
    /// Content delivered only after the delay, to simulate a stalled call.
    Delayed(String, Duration),
}

/// A mock LLM provider that returns pre-configured replies.
///
/// An empty text queue answers "mock response". An empty structured queue
/// fails with a non-retryable transport error, so unscripted memory calls
/// degrade immediately.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue free-text replies in order.
    pub async fn with_text_responses(responses: &[&str]) -> Self {
        let provider = Self::new();
        for r in responses {
            provider.push_text(r).await;
        }
        provider
    }

    pub async fn push_text(&self, content: &str) {
        self.push(TEXT_KEY, MockReply::Content(content.to_string())).await;
    }

    /// Queue a reply for requests using the named schema.
    pub async fn push_response(&self, schema: &str, content: &str) {
        self.push(schema, MockReply::Content(content.to_string())).await;
    }

    /// Queue a reply that arrives after `delay`.
    pub async fn push_delayed_response(&self, schema: &str, content: &str, delay: Duration) {
        self.push(schema, MockReply::Delayed(content.to_string(), delay)).await;
    }

    pub async fn push_error(&self, schema: &str, kind: ProviderErrorKind) {
        self.push(schema, MockReply::Error(kind)).await;
    }

    async fn push(&self, key: &str, reply: MockReply) {
        self.replies
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request received, in arrival order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of requests received for a schema name (or [`TEXT_KEY`]).
    pub async fn calls_for(&self, key: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.schema_name().unwrap_or(TEXT_KEY) == key)
            .count()
    }

    /// Replies still queued for a key.
    pub async fn remaining(&self, key: &str) -> usize {
        self.replies.lock().await.get(key).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, TopicaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TopicaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, TopicaError> {
        let key = request.schema_name().unwrap_or(TEXT_KEY).to_string();
        let model = request.model.clone().unwrap_or_else(|| "mock-model".to_string());
        self.requests.lock().await.push(request);

        let reply = self
            .replies
            .lock()
            .await
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(MockReply::Content(content)) => Ok(ProviderResponse { content, model }),
            Some(MockReply::Delayed(content, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(ProviderResponse { content, model })
            }
            Some(MockReply::Error(kind)) => Err(TopicaError::provider(kind, format!("scripted {kind} for {key}"))),
            None if key == TEXT_KEY => Ok(ProviderResponse {
                content: DEFAULT_TEXT.to_string(),
                model,
            }),
            None => Err(TopicaError::provider(
                ProviderErrorKind::Transport,
                format!("no scripted reply for {key}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topica_core::types::ResponseFormat;

    fn structured(name: &str) -> ProviderRequest {
        ProviderRequest::structured(
            "prompt",
            ResponseFormat {
                name: name.into(),
                schema: Default::default(),
            },
        )
    }

    #[tokio::test]
    async fn default_text_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(ProviderRequest::text("hi")).await.unwrap();
        assert_eq!(resp.content, "mock response");
    }

    #[tokio::test]
    async fn replies_are_routed_by_schema() {
        let provider = MockProvider::with_text_responses(&["first text"]).await;
        provider.push_response("FactsResponse", "{\"facts\": []}").await;

        let facts = provider.complete(structured("FactsResponse")).await.unwrap();
        let text = provider.complete(ProviderRequest::text("hi")).await.unwrap();
        assert_eq!(facts.content, "{\"facts\": []}");
        assert_eq!(text.content, "first text");
        assert_eq!(provider.calls_for("FactsResponse").await, 1);
        assert_eq!(provider.calls_for(TEXT_KEY).await, 1);
    }

    #[tokio::test]
    async fn unscripted_structured_call_fails() {
        let provider = MockProvider::new();
        let err = provider.complete(structured("TopicLabel")).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn scripted_errors_keep_their_kind() {
        let provider = MockProvider::new();
        provider.push_error("TopicLabel", ProviderErrorKind::Timeout).await;
        let err = provider.complete(structured("TopicLabel")).await.unwrap_err();
        assert!(matches!(
            err,
            TopicaError::Provider { kind: ProviderErrorKind::Timeout, .. }
        ));
        assert_eq!(provider.remaining("TopicLabel").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits_before_answering() {
        let provider = MockProvider::new();
        provider
            .push_delayed_response("TopicLabel", "{}", Duration::from_secs(30))
            .await;

        let start = tokio::time::Instant::now();
        let resp = provider.complete(structured("TopicLabel")).await.unwrap();
        assert_eq!(resp.content, "{}");
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
