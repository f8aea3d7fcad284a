// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact extraction from user turns.

use std::sync::Arc;

use tokio::task::JoinHandle;
use topica_core::{ProviderAdapter, TopicaError};
use tracing::debug;

use crate::prompts;
use crate::structured::{RetryPolicy, generate_structured};
use crate::types::{ExtractedFact, FactsResponse};

/// Proposes facts about the user. Filtering and merging happen in
/// [`crate::long_term::LongTermStore::merge_facts`].
pub struct FactExtractor {
    provider: Arc<dyn ProviderAdapter>,
    retry: RetryPolicy,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub async fn extract(&self, user_turn: &str) -> Result<Vec<ExtractedFact>, TopicaError> {
        if user_turn.trim().is_empty() {
            return Ok(Vec::new());
        }
        let prompt = prompts::extract_facts(user_turn);
        let response: FactsResponse = generate_structured(self.provider.as_ref(), &prompt, &self.retry).await?;
        debug!(candidates = response.facts.len(), "facts extracted");
        Ok(response.facts)
    }

    /// Run extraction on a background task.
    pub fn spawn(self: &Arc<Self>, user_turn: String) -> JoinHandle<Result<Vec<ExtractedFact>, TopicaError>> {
        let extractor = Arc::clone(self);
        tokio::spawn(async move { extractor.extract(&user_turn).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use topica_test_utils::MockProvider;

    fn extractor(provider: Arc<MockProvider>) -> Arc<FactExtractor> {
        let retry = RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(5),
        };
        Arc::new(FactExtractor::new(provider, retry))
    }

    #[tokio::test]
    async fn returns_candidates_unfiltered() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_response(
                "FactsResponse",
                r#"{"facts": [
                    {"field": "name", "value": "Alice", "importance": 10},
                    {"field": "mood", "value": "happy", "importance": 2}
                ]}"#,
            )
            .await;

        let facts = extractor(provider.clone())
            .spawn("My name is Alice and I'm happy today".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(facts.len(), 2);
        assert!(provider.requests().await[0].prompt.contains("My name is Alice"));
    }

    #[tokio::test]
    async fn blank_turn_makes_no_call() {
        let provider = Arc::new(MockProvider::new());
        let facts = extractor(provider.clone()).extract("  ").await.unwrap();
        assert!(facts.is_empty());
        assert!(provider.requests().await.is_empty());
    }
}
