// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic summarization: one combined label+summary call, then an embedding.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use topica_core::{EmbeddingAdapter, ProviderAdapter};
use tracing::{debug, warn};

use crate::embedding::embed_text;
use crate::prompts;
use crate::structured::{RetryPolicy, generate_structured};
use crate::types::{
    Exchange, PLACEHOLDER_NAME, PLACEHOLDER_SUMMARY, Topic, TopicLabel, TopicSummary,
    format_transcript,
};

pub struct Summarizer {
    provider: Arc<dyn ProviderAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    retry: RetryPolicy,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn ProviderAdapter>, embedder: Arc<dyn EmbeddingAdapter>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            embedder,
            retry,
        }
    }

    /// Produce a name, summary, and embedding for a closed thread.
    ///
    /// Never fails: a failed label call yields the placeholder summary and
    /// keeps `known_name` (the placeholder name when there is none), and the
    /// name is embedded instead of the summary.
    pub async fn summarize(&self, exchanges: &[Exchange], known_name: Option<&str>) -> TopicSummary {
        let fallback_name = known_name
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != PLACEHOLDER_NAME)
            .unwrap_or(PLACEHOLDER_NAME);

        let prompt = prompts::close_topic(&format_transcript(exchanges));
        let (name, summary) =
            match generate_structured::<TopicLabel>(self.provider.as_ref(), &prompt, &self.retry).await {
                Ok(label) if !label.summary.trim().is_empty() => {
                    let name = match label.label.trim() {
                        "" => fallback_name,
                        n => n,
                    };
                    (name.to_string(), label.summary.trim().to_string())
                }
                Ok(_) => {
                    warn!("topic label returned an empty summary");
                    (fallback_name.to_string(), PLACEHOLDER_SUMMARY.to_string())
                }
                Err(e) => {
                    warn!(error = %e, "topic summarization failed");
                    (fallback_name.to_string(), PLACEHOLDER_SUMMARY.to_string())
                }
            };

        let mut result = TopicSummary {
            name,
            summary,
            embedding: None,
        };
        let source = if result.is_placeholder() {
            &result.name
        } else {
            &result.summary
        };
        result.embedding = match embed_text(self.embedder.as_ref(), source).await {
            Ok(v) if !v.is_empty() => Some(v),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "topic summary embedding failed");
                None
            }
        };
        debug!(name = %result.name, placeholder = result.is_placeholder(), "summarized topic");
        result
    }

    /// Summarize a closed topic on a background task.
    pub fn spawn(self: &Arc<Self>, topic: Topic) -> PendingSummary {
        let summarizer = Arc::clone(self);
        let topic_id = topic.id.clone();
        let handle =
            tokio::spawn(async move { summarizer.summarize(&topic.exchanges, topic.name.as_deref()).await });
        PendingSummary { topic_id, handle }
    }
}

/// Result of a bounded wait on a pending summary.
#[derive(Debug)]
pub enum SummaryWait {
    Ready(TopicSummary),
    /// The task panicked or was cancelled; the topic keeps its placeholder.
    Failed,
    /// Still running when the wait ran out.
    Pending,
}

/// A summarization task whose result has not been applied yet.
#[derive(Debug)]
pub struct PendingSummary {
    pub topic_id: String,
    handle: JoinHandle<TopicSummary>,
}

impl PendingSummary {
    /// Wait up to `limit` for the task to finish.
    ///
    /// After `Ready` or `Failed` the handle must not be waited on again.
    pub async fn wait(&mut self, limit: Duration) -> SummaryWait {
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(summary)) => SummaryWait::Ready(summary),
            Ok(Err(e)) => {
                warn!(topic_id = %self.topic_id, error = %e, "summary task failed");
                SummaryWait::Failed
            }
            Err(_) => SummaryWait::Pending,
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}
