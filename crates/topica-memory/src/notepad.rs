// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-of-session notepad reflection and compression.

use std::sync::Arc;

use topica_config::model::MemoryConfig;
use topica_core::ProviderAdapter;
use tracing::{debug, info, warn};

use crate::prompts;
use crate::structured::{RetryPolicy, generate_structured};
use crate::types::{NotepadUpdate, Topic, format_transcript};

/// Minimum exchanges a topic needs to feed reflection.
pub const MIN_REFLECTION_EXCHANGES: usize = 2;

pub struct NotepadReflector {
    provider: Arc<dyn ProviderAdapter>,
    retry: RetryPolicy,
    max_chars: usize,
    topic_window: usize,
}

impl NotepadReflector {
    pub fn new(provider: Arc<dyn ProviderAdapter>, config: &MemoryConfig, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            max_chars: config.notepad_max_chars,
            topic_window: config.notepad_topic_window,
        }
    }

    /// Rewrite the notepad from this session's topics.
    ///
    /// Returns `None` when no topic qualifies or the rewrite fails; the
    /// caller keeps the current notepad in that case.
    pub async fn reflect<'a>(
        &self,
        current: &str,
        topics: impl IntoIterator<Item = &'a Topic>,
    ) -> Option<String> {
        let eligible: Vec<&Topic> = topics
            .into_iter()
            .filter(|t| t.len() >= MIN_REFLECTION_EXCHANGES)
            .collect();
        if eligible.is_empty() {
            debug!("no topic long enough for notepad reflection");
            return None;
        }

        let recent = &eligible[eligible.len().saturating_sub(self.topic_window)..];
        let rendered = recent
            .iter()
            .map(|t| format!("## {}\n{}", t.display_name(), format_transcript(&t.exchanges)))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = prompts::reflect_notepad(current, &rendered);
        let updated = match generate_structured::<NotepadUpdate>(self.provider.as_ref(), &prompt, &self.retry).await {
            Ok(update) => update.updated_notepad.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "notepad reflection failed, keeping current notepad");
                return None;
            }
        };

        info!(chars = updated.chars().count(), "notepad updated");
        Some(self.compress_if_needed(updated).await)
    }

    /// Shorten a notepad over the size limit. A failed compression keeps the
    /// long version.
    pub async fn compress_if_needed(&self, notepad: String) -> String {
        if notepad.chars().count() <= self.max_chars {
            return notepad;
        }

        let prompt = prompts::compress_notepad(&notepad, self.max_chars);
        match generate_structured::<NotepadUpdate>(self.provider.as_ref(), &prompt, &self.retry).await {
            Ok(update) if !update.updated_notepad.trim().is_empty() => {
                let compressed = update.updated_notepad.trim().to_string();
                info!(
                    before = notepad.chars().count(),
                    after = compressed.chars().count(),
                    "notepad compressed"
                );
                compressed
            }
            Ok(_) => notepad,
            Err(e) => {
                warn!(error = %e, "notepad compression failed, keeping long notepad");
                notepad
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Exchange;
    use std::time::Duration;
    use topica_test_utils::MockProvider;

    fn reflector(provider: Arc<MockProvider>, max_chars: usize) -> NotepadReflector {
        let config = MemoryConfig {
            notepad_max_chars: max_chars,
            ..MemoryConfig::default()
        };
        let retry = RetryPolicy {
            max_attempts: 1,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(5),
        };
        NotepadReflector::new(provider, &config, retry)
    }

    fn topic(n: usize) -> Topic {
        let mut topic = Topic::open();
        for i in 0..n {
            topic.exchanges.push(Exchange::user(format!("message {i}")));
        }
        topic
    }

    #[tokio::test]
    async fn skipped_without_substantial_topics() {
        let provider = Arc::new(MockProvider::new());
        let r = reflector(provider.clone(), 8000);
        assert!(r.reflect("", [&topic(1)]).await.is_none());
        assert!(provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn reflection_rewrites_notepad() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_response("NotepadUpdate", r#"{"updated_notepad": "Prefers short answers."}"#)
            .await;
        let r = reflector(provider.clone(), 8000);

        let updated = r.reflect("", [&topic(2)]).await;
        assert_eq!(updated.as_deref(), Some("Prefers short answers."));
        assert!(provider.requests().await[0].prompt.contains("(empty)"));
    }

    #[tokio::test]
    async fn long_notepad_is_compressed() {
        let provider = Arc::new(MockProvider::new());
        let long = "x".repeat(50);
        provider
            .push_response("NotepadUpdate", &serde_json::json!({ "updated_notepad": long }).to_string())
            .await;
        provider
            .push_response("NotepadUpdate", r#"{"updated_notepad": "short"}"#)
            .await;
        let r = reflector(provider.clone(), 20);

        let updated = r.reflect("old", [&topic(4)]).await;
        assert_eq!(updated.as_deref(), Some("short"));
        assert_eq!(provider.calls_for("NotepadUpdate").await, 2);
    }

    #[tokio::test]
    async fn failed_compression_keeps_long_notepad() {
        let provider = Arc::new(MockProvider::new());
        let r = reflector(provider, 3);
        assert_eq!(r.compress_if_needed("too long".into()).await, "too long");
    }
}
