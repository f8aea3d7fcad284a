// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-session retrieval over the long-term store.

use topica_config::model::MemoryConfig;
use tracing::debug;

use crate::long_term::LongTermStore;
use crate::short_term::TopicDigest;
use crate::similarity::{Scored, cosine_similarity, top_k_above};

/// An archived topic summary selected for the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantTopic {
    pub digest: TopicDigest,
    pub similarity: f32,
    pub source_session: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTermContext {
    /// `(key, value)` pairs for every stored fact.
    pub facts: Vec<(String, String)>,
    /// Notepad, truncated for the prompt.
    pub notepad: String,
    /// Summaries only; archived threads are never included.
    pub topics: Vec<RelevantTopic>,
}

#[derive(Debug, Clone)]
pub struct LongTermRetriever {
    threshold: f32,
    max_k: usize,
    notepad_chars: usize,
}

impl LongTermRetriever {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            threshold: config.long_term_threshold,
            max_k: config.long_term_max_k,
            notepad_chars: config.notepad_context_chars,
        }
    }

    pub fn retrieve(
        &self,
        query_embedding: Option<&[f32]>,
        store: &LongTermStore,
        current_session: &str,
    ) -> LongTermContext {
        let facts = store
            .facts()
            .iter()
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect();
        let notepad = truncate_chars(store.notepad(), self.notepad_chars);

        LongTermContext {
            facts,
            notepad,
            topics: self.rank(query_embedding, store, current_session),
        }
    }

    /// Archived topics from other sessions above the threshold, best first.
    pub fn rank(
        &self,
        query_embedding: Option<&[f32]>,
        store: &LongTermStore,
        current_session: &str,
    ) -> Vec<RelevantTopic> {
        let Some(query) = query_embedding.filter(|q| !q.is_empty()) else {
            return Vec::new();
        };

        let scored = store
            .archive()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.source_session != current_session)
            .filter_map(|(recency, t)| {
                let embedding = store.embedding(&t.id)?;
                Some(Scored {
                    item: t,
                    similarity: cosine_similarity(query, embedding),
                    recency,
                })
            })
            .collect();

        top_k_above(scored, self.threshold, self.max_k)
            .into_iter()
            .map(|s| {
                debug!(topic_id = %s.item.id, similarity = s.similarity, "long-term topic");
                RelevantTopic {
                    digest: TopicDigest {
                        id: s.item.id.clone(),
                        name: s.item.name.clone(),
                        summary: s.item.summary.clone(),
                    },
                    similarity: s.similarity,
                    source_session: s.item.source_session.clone(),
                }
            })
            .collect()
    }
}

/// First `max` characters of `text`, with "..." appended when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
