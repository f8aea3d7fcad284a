// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-session memory for one user: fact table, notepad, and the closed
//! topic archive with its parallel embedding map.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{ArchivedTopic, ExtractedFact, Fact, Topic, TopicSummary, now_timestamp};

/// Everything persisted for a user, as loaded from or written to storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMemorySnapshot {
    pub facts: BTreeMap<String, Fact>,
    pub notepad: String,
    pub archive: Vec<ArchivedTopic>,
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

/// Mismatches found when joining archive records with their embeddings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Embedding entries with no archive record; dropped.
    pub dangling_embeddings: Vec<String>,
    /// Archive records with no embedding; re-embedded at session start.
    pub missing_embeddings: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_embeddings.is_empty() && self.missing_embeddings.is_empty()
    }
}

/// Admission and capacity rules for the fact table.
#[derive(Debug, Clone, Copy)]
pub struct FactPolicy {
    pub importance_threshold: u8,
    pub capacity: usize,
}

/// Outcome of merging one extraction result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactMergeReport {
    pub stored: Vec<String>,
    pub rejected: usize,
    pub evicted: Vec<String>,
}

/// Which parts of long-term memory to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearScope {
    pub facts: bool,
    pub topics: bool,
    pub notepad: bool,
}

impl ClearScope {
    pub const ALL: ClearScope = ClearScope {
        facts: true,
        topics: true,
        notepad: true,
    };
}

#[derive(Debug, Clone)]
pub struct LongTermStore {
    username: String,
    facts: BTreeMap<String, Fact>,
    notepad: String,
    archive: Vec<ArchivedTopic>,
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl LongTermStore {
    pub fn new(username: impl Into<String>) -> Self {
        Self::from_snapshot(username, UserMemorySnapshot::default()).0
    }

    /// Build a store from persisted data, joining embeddings to archive
    /// records by id.
    pub fn from_snapshot(username: impl Into<String>, snapshot: UserMemorySnapshot) -> (Self, ReconcileReport) {
        let mut store = Self {
            username: username.into(),
            facts: snapshot.facts,
            notepad: snapshot.notepad,
            archive: snapshot.archive,
            embeddings: snapshot.embeddings,
        };
        let report = store.reconcile();
        (store, report)
    }

    /// Copy of the persistable state.
    pub fn snapshot(&self) -> UserMemorySnapshot {
        UserMemorySnapshot {
            facts: self.facts.clone(),
            notepad: self.notepad.clone(),
            archive: self.archive.clone(),
            embeddings: self.embeddings.clone(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn facts(&self) -> &BTreeMap<String, Fact> {
        &self.facts
    }

    pub fn fact(&self, key: &str) -> Option<&Fact> {
        self.facts.get(key)
    }

    pub fn notepad(&self) -> &str {
        &self.notepad
    }

    pub fn set_notepad(&mut self, notepad: impl Into<String>) {
        self.notepad = notepad.into();
    }

    pub fn archive(&self) -> &[ArchivedTopic] {
        &self.archive
    }

    pub fn embedding(&self, topic_id: &str) -> Option<&[f32]> {
        self.embeddings.get(topic_id).map(Vec::as_slice)
    }

    pub fn set_embedding(&mut self, topic_id: &str, embedding: Vec<f32>) {
        if self.archive.iter().any(|t| t.id == topic_id) && !embedding.is_empty() {
            self.embeddings.insert(topic_id.to_string(), embedding);
        }
    }

    /// Drop embeddings with no archive record and list records with no
    /// embedding.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let ids: HashSet<&str> = self.archive.iter().map(|t| t.id.as_str()).collect();

        let dangling_embeddings: Vec<String> = self
            .embeddings
            .keys()
            .filter(|id| !ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &dangling_embeddings {
            warn!(user = %self.username, topic_id = %id, "dropping embedding with no archived topic");
            self.embeddings.remove(id);
        }

        let missing_embeddings: Vec<String> = self
            .archive
            .iter()
            .filter(|t| !self.embeddings.contains_key(&t.id))
            .map(|t| t.id.clone())
            .collect();
        for id in &missing_embeddings {
            warn!(user = %self.username, topic_id = %id, "archived topic has no embedding");
        }

        ReconcileReport {
            dangling_embeddings,
            missing_embeddings,
        }
    }

    /// Merge extracted facts into the table.
    ///
    /// Importance is clamped into 1..=10; facts below the threshold and empty
    /// keys or values are rejected. Existing keys are overwritten in place.
    /// A new key arriving at capacity evicts the least important fact,
    /// oldest first on ties. The table never exceeds `policy.capacity`
    /// afterwards, even when it was loaded over capacity.
    pub fn merge_facts(&mut self, extracted: &[ExtractedFact], policy: FactPolicy) -> FactMergeReport {
        let mut report = FactMergeReport::default();
        let capacity = policy.capacity.max(1);

        for candidate in extracted {
            let key = candidate.field.trim();
            let value = candidate.value.trim();
            let importance = candidate.importance.clamp(1, 10) as u8;
            if key.is_empty() || value.is_empty() || importance < policy.importance_threshold {
                debug!(key, importance, "fact rejected");
                report.rejected += 1;
                continue;
            }

            let fact = Fact {
                value: value.to_string(),
                importance,
                updated_at: now_timestamp(),
            };

            if let Some(existing) = self.facts.get_mut(key) {
                *existing = fact;
                report.stored.push(key.to_string());
                continue;
            }

            while self.facts.len() >= capacity {
                match self.eviction_candidate() {
                    Some(victim) => {
                        debug!(evicted = %victim, incoming = key, "fact table at capacity");
                        self.facts.remove(&victim);
                        report.evicted.push(victim);
                    }
                    None => break,
                }
            }
            self.facts.insert(key.to_string(), fact);
            report.stored.push(key.to_string());
        }

        // A table loaded under a larger capacity shrinks on the next merge.
        while self.facts.len() > capacity {
            let Some(victim) = self.eviction_candidate() else {
                break;
            };
            debug!(evicted = %victim, capacity, "fact table over capacity");
            self.facts.remove(&victim);
            report.evicted.push(victim);
        }

        if !report.stored.is_empty() {
            info!(user = %self.username, stored = report.stored.len(), "facts merged");
        }
        report
    }

    /// The fact with the lowest importance, oldest first on ties.
    ///
    /// Picking the global minimum means a fact at least as important as the
    /// incoming one only goes when nothing lower is left.
    fn eviction_candidate(&self) -> Option<String> {
        self.facts
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.importance
                    .cmp(&b.importance)
                    .then_with(|| a.updated_at.cmp(&b.updated_at))
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone())
    }

    /// Append a session's non-empty topics to the archive.
    ///
    /// Topics already archived (same id) are skipped, so a retried merge
    /// does not duplicate records. Returns the number appended.
    pub fn merge_session_topics<'a>(
        &mut self,
        topics: impl IntoIterator<Item = &'a Topic>,
        session_id: &str,
    ) -> usize {
        let mut appended = 0;
        for topic in topics {
            if topic.is_empty() || self.archive.iter().any(|t| t.id == topic.id) {
                continue;
            }
            self.archive.push(ArchivedTopic::from_topic(topic, session_id));
            if let Some(embedding) = topic.embedding.as_ref().filter(|e| !e.is_empty()) {
                self.embeddings.insert(topic.id.clone(), embedding.clone());
            }
            appended += 1;
        }
        if appended > 0 {
            info!(user = %self.username, session_id, appended, "archived session topics");
        }
        appended
    }

    /// Archived topics still carrying the placeholder summary, oldest first.
    pub fn placeholder_topics(&self, limit: usize) -> Vec<&ArchivedTopic> {
        self.archive
            .iter()
            .filter(|t| t.has_placeholder_summary() && !t.exchanges.is_empty())
            .take(limit)
            .collect()
    }

    /// Archive records with no embedding.
    pub fn topics_missing_embeddings(&self) -> Vec<&ArchivedTopic> {
        self.archive
            .iter()
            .filter(|t| !self.embeddings.contains_key(&t.id))
            .collect()
    }

    /// Replace a placeholder summary on an archived topic.
    pub fn update_archived_summary(&mut self, topic_id: &str, summary: TopicSummary) -> bool {
        if summary.is_placeholder() {
            return false;
        }
        let Some(record) = self.archive.iter_mut().find(|t| t.id == topic_id) else {
            return false;
        };
        if !record.has_placeholder_summary() {
            return false;
        }
        record.name = summary.name;
        record.summary = summary.summary;
        if let Some(embedding) = summary.embedding.filter(|e| !e.is_empty()) {
            self.embeddings.insert(topic_id.to_string(), embedding);
        }
        true
    }

    /// Clear the selected parts of memory.
    pub fn clear(&mut self, scope: ClearScope) {
        if scope.facts {
            self.facts.clear();
        }
        if scope.topics {
            self.archive.clear();
            self.embeddings.clear();
        }
        if scope.notepad {
            self.notepad.clear();
        }
        info!(user = %self.username, ?scope, "cleared long-term memory");
    }
}
