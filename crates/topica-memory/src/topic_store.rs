// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session topic state: one open topic plus the closed topics in close order.

use tracing::{debug, info};

use crate::types::{Exchange, PLACEHOLDER_NAME, Topic, TopicSummary};

/// Topics of a single session.
///
/// Only the session orchestrator mutates a store. Closing hands back a
/// snapshot of the closed topic for the summarizer task; the summary comes
/// back through [`TopicStore::apply_summary`].
#[derive(Debug, Clone)]
pub struct TopicStore {
    session_id: String,
    open: Option<Topic>,
    closed: Vec<Topic>,
}

impl TopicStore {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            open: None,
            closed: Vec::new(),
        }
    }

    pub fn open_topic(&self) -> Option<&Topic> {
        self.open.as_ref()
    }

    /// Number of exchanges in the open topic (0 when none is open).
    pub fn open_len(&self) -> usize {
        self.open.as_ref().map_or(0, Topic::len)
    }

    /// Closed topics, oldest close first.
    pub fn closed_topics(&self) -> &[Topic] {
        &self.closed
    }

    pub fn closed_topic(&self, id: &str) -> Option<&Topic> {
        self.closed.iter().find(|t| t.id == id)
    }

    /// Closed topics plus the open topic, skipping empty ones.
    pub fn non_empty_topics(&self) -> impl Iterator<Item = &Topic> {
        self.closed.iter().chain(self.open.iter()).filter(|t| !t.is_empty())
    }

    /// Append a user/assistant pair to the open topic, opening one if needed.
    ///
    /// When the pair would push a non-empty open topic past `max_chars`, the
    /// open topic is closed first and the pair seeds a fresh topic. The
    /// auto-closed topic is returned for summarization.
    pub fn append_pair(&mut self, user: Exchange, assistant: Exchange, max_chars: usize) -> Option<Topic> {
        let incoming = user.char_count() + assistant.char_count();
        let overflow = self
            .open
            .as_ref()
            .is_some_and(|t| !t.is_empty() && t.char_count() + incoming > max_chars);

        let closed = if overflow {
            debug!(incoming, max_chars, "open topic would overflow, closing before append");
            self.close_open()
        } else {
            None
        };

        let topic = self.open.get_or_insert_with(|| {
            let topic = Topic::open();
            info!(topic_id = %topic.id, "opened topic");
            topic
        });
        topic.push(user);
        topic.push(assistant);
        closed
    }

    /// Move the last `tail` exchanges of the open topic into a new topic and
    /// close the remainder.
    ///
    /// Returns the closed topic. Does nothing when the open topic has no
    /// exchanges ahead of the tail.
    pub fn split_open(&mut self, tail: usize, new_name: Option<String>) -> Option<Topic> {
        let open = self.open.as_mut()?;
        if open.len() <= tail {
            return None;
        }
        let moved = open.exchanges.split_off(open.len() - tail);
        let closed = self.close_open();

        let mut topic = Topic::open();
        topic.name = new_name;
        topic.exchanges = moved;
        info!(topic_id = %topic.id, name = topic.display_name(), "opened topic after shift");
        self.open = Some(topic);
        closed
    }

    /// Close the open topic. An empty open topic is discarded.
    pub fn close_open(&mut self) -> Option<Topic> {
        let mut topic = self.open.take()?;
        if topic.is_empty() {
            debug!(topic_id = %topic.id, "discarding empty topic");
            return None;
        }
        topic.close();
        info!(
            session_id = %self.session_id,
            topic_id = %topic.id,
            exchanges = topic.len(),
            "closed topic"
        );
        self.closed.push(topic.clone());
        Some(topic)
    }

    /// Write a summarizer result into a closed topic.
    ///
    /// A real summary is written once; a placeholder result never replaces
    /// an existing summary. Returns whether the topic changed.
    pub fn apply_summary(&mut self, topic_id: &str, summary: TopicSummary) -> bool {
        let Some(topic) = self.closed.iter_mut().find(|t| t.id == topic_id) else {
            debug!(topic_id, "summary for unknown topic ignored");
            return false;
        };
        if !topic.has_placeholder_summary() {
            return false;
        }
        if summary.is_placeholder() && topic.summary.is_some() {
            return false;
        }

        let keeps_name = summary.is_placeholder()
            && topic
                .name
                .as_deref()
                .is_some_and(|n| !n.trim().is_empty() && n != PLACEHOLDER_NAME);
        if !keeps_name {
            topic.name = Some(summary.name);
        }
        topic.summary = Some(summary.summary);
        if summary.embedding.is_some() {
            topic.embedding = summary.embedding;
        }
        true
    }
}
