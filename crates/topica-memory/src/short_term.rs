// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Within-session retrieval.

use topica_config::model::MemoryConfig;
use tracing::debug;

use crate::similarity::{Scored, cosine_similarity, top_k_above};
use crate::topic_store::TopicStore;
use crate::types::{Exchange, Topic};

/// Name and summary of a topic, without its exchanges.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDigest {
    pub id: String,
    pub name: String,
    pub summary: String,
}

impl TopicDigest {
    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            id: topic.id.clone(),
            name: topic.display_name().to_string(),
            summary: topic.display_summary().to_string(),
        }
    }
}

/// A closed topic included with its full thread.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicThread {
    pub digest: TopicDigest,
    pub exchanges: Vec<Exchange>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortTermContext {
    /// Exchanges of the open topic.
    pub current: Vec<Exchange>,
    /// Every closed topic of the session, in close order.
    pub closed: Vec<TopicDigest>,
    /// Closed topics relevant enough to include verbatim.
    pub threads: Vec<TopicThread>,
}

#[derive(Debug, Clone)]
pub struct ShortTermRetriever {
    threshold: f32,
    max_k: usize,
}

impl ShortTermRetriever {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            threshold: config.short_term_threshold,
            max_k: config.short_term_max_k,
        }
    }

    /// Gather session context for a query.
    ///
    /// Without a query embedding no threads are selected; the open topic and
    /// closed summaries are always returned.
    pub fn retrieve(&self, query_embedding: Option<&[f32]>, store: &TopicStore) -> ShortTermContext {
        let current = store
            .open_topic()
            .map(|t| t.exchanges.clone())
            .unwrap_or_default();
        let closed_topics = store.closed_topics();
        let closed = closed_topics.iter().map(TopicDigest::from_topic).collect();

        let threads = match query_embedding {
            Some(query) if !query.is_empty() => {
                let scored = closed_topics
                    .iter()
                    .enumerate()
                    .filter_map(|(recency, topic)| {
                        let embedding = topic.embedding.as_deref()?;
                        Some(Scored {
                            item: topic,
                            similarity: cosine_similarity(query, embedding),
                            recency,
                        })
                    })
                    .collect();

                top_k_above(scored, self.threshold, self.max_k)
                    .into_iter()
                    .map(|s| {
                        debug!(topic_id = %s.item.id, similarity = s.similarity, "short-term thread");
                        TopicThread {
                            digest: TopicDigest::from_topic(s.item),
                            exchanges: s.item.exchanges.clone(),
                            similarity: s.similarity,
                        }
                    })
                    .collect()
            }
            _ => Vec::new(),
        };

        ShortTermContext {
            current,
            closed,
            threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TopicSummary;

    fn closed_topic(store: &mut TopicStore, text: &str, embedding: Vec<f32>) -> String {
        store.append_pair(Exchange::user(text), Exchange::assistant("ok"), 25_000);
        let id = store.close_open().unwrap().id;
        store.apply_summary(
            &id,
            TopicSummary {
                name: text.into(),
                summary: format!("About {text}."),
                embedding: Some(embedding),
            },
        );
        id
    }

    #[test]
    fn returns_open_topic_and_all_summaries() {
        let mut store = TopicStore::new("s1");
        closed_topic(&mut store, "rust", vec![1.0, 0.0]);
        closed_topic(&mut store, "go", vec![0.0, 1.0]);
        store.append_pair(Exchange::user("now"), Exchange::assistant("yes"), 25_000);

        let ctx = ShortTermRetriever::new(&MemoryConfig::default()).retrieve(None, &store);
        assert_eq!(ctx.current.len(), 2);
        assert_eq!(ctx.closed.len(), 2);
        assert_eq!(ctx.closed[0].name, "rust");
        assert!(ctx.threads.is_empty());
    }

    #[test]
    fn selects_at_most_two_threads_above_threshold() {
        let mut store = TopicStore::new("s1");
        closed_topic(&mut store, "a", vec![1.0, 0.0]);
        closed_topic(&mut store, "b", vec![1.0, 0.1]);
        closed_topic(&mut store, "c", vec![1.0, 0.05]);
        closed_topic(&mut store, "d", vec![0.0, 1.0]);

        let ctx = ShortTermRetriever::new(&MemoryConfig::default()).retrieve(Some(&[1.0, 0.0]), &store);
        assert_eq!(ctx.threads.len(), 2);
        assert!(ctx.threads.iter().all(|t| t.similarity > 0.75));
        assert_eq!(ctx.threads[0].digest.name, "a");
        assert_eq!(ctx.threads[1].digest.name, "c");
        assert_eq!(ctx.threads[0].exchanges.len(), 2);
    }

    #[test]
    fn equal_similarity_prefers_later_close() {
        let mut store = TopicStore::new("s1");
        closed_topic(&mut store, "first", vec![1.0, 0.0]);
        closed_topic(&mut store, "second", vec![1.0, 0.0]);
        closed_topic(&mut store, "third", vec![1.0, 0.0]);

        let ctx = ShortTermRetriever::new(&MemoryConfig::default()).retrieve(Some(&[1.0, 0.0]), &store);
        let names: Vec<_> = ctx.threads.iter().map(|t| t.digest.name.as_str()).collect();
        assert_eq!(names, vec!["third", "second"]);
    }

    #[test]
    fn topics_without_embeddings_are_not_ranked() {
        let mut store = TopicStore::new("s1");
        store.append_pair(Exchange::user("x"), Exchange::assistant("y"), 25_000);
        store.close_open();

        let ctx = ShortTermRetriever::new(&MemoryConfig::default()).retrieve(Some(&[1.0, 0.0]), &store);
        assert_eq!(ctx.closed.len(), 1);
        assert!(ctx.threads.is_empty());
    }
}
