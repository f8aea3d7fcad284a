// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types: exchanges, topics, facts, and the structured
//! outputs requested from the LLM.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Summary shown for a closed topic whose summarization has not succeeded.
pub const PLACEHOLDER_SUMMARY: &str = "No summary available";

/// Name shown for a topic that has not been named yet.
pub const PLACEHOLDER_NAME: &str = "Unnamed Topic";

/// Current time in the timestamp format used by every persisted record.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Who produced an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a topic thread. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub role: Role,
    pub text: String,
    pub timestamp: String,
}

impl Exchange {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: now_timestamp(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Length in characters, as counted against the topic ceiling.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Render exchanges as `role: text` lines.
pub fn format_transcript(exchanges: &[Exchange]) -> String {
    exchanges
        .iter()
        .map(|e| format!("{}: {}", e.role.as_str(), e.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lifecycle state of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicState {
    Open,
    Closed,
}

/// A contiguous, semantically coherent run of exchanges.
///
/// The embedding is kept out of the serialized record; it is persisted in a
/// separate map keyed by topic id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub exchanges: Vec<Exchange>,
    pub name: Option<String>,
    pub summary: Option<String>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub state: TopicState,
    pub created_at: String,
    pub closed_at: Option<String>,
}

impl Topic {
    /// A new, empty, open topic.
    pub fn open() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            exchanges: Vec::new(),
            name: None,
            summary: None,
            embedding: None,
            state: TopicState::Open,
            created_at: now_timestamp(),
            closed_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.state == TopicState::Open
    }

    /// Total characters across all exchanges.
    pub fn char_count(&self) -> usize {
        self.exchanges.iter().map(Exchange::char_count).sum()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(PLACEHOLDER_NAME)
    }

    pub fn display_summary(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(PLACEHOLDER_SUMMARY)
    }

    /// True until a real summary has been applied.
    pub fn has_placeholder_summary(&self) -> bool {
        is_placeholder_summary(self.summary.as_deref())
    }

    pub(crate) fn push(&mut self, exchange: Exchange) {
        debug_assert!(self.is_open(), "closed topics are immutable");
        self.exchanges.push(exchange);
    }

    pub(crate) fn close(&mut self) {
        self.state = TopicState::Closed;
        self.closed_at = Some(now_timestamp());
    }
}

/// Whether a stored summary is missing or still the placeholder text.
pub fn is_placeholder_summary(summary: Option<&str>) -> bool {
    match summary {
        None => true,
        Some(s) => s.trim().is_empty() || s == PLACEHOLDER_SUMMARY,
    }
}

/// Name, summary, and embedding produced when a topic closes.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSummary {
    pub name: String,
    pub summary: String,
    pub embedding: Option<Vec<f32>>,
}

impl TopicSummary {
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_summary(Some(&self.summary))
    }
}

/// A closed topic as stored in the cross-session archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedTopic {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub exchanges: Vec<Exchange>,
    pub created_at: String,
    pub closed_at: Option<String>,
    pub source_session: String,
}

impl ArchivedTopic {
    pub fn from_topic(topic: &Topic, source_session: &str) -> Self {
        Self {
            id: topic.id.clone(),
            name: topic.display_name().to_string(),
            summary: topic.display_summary().to_string(),
            exchanges: topic.exchanges.clone(),
            created_at: topic.created_at.clone(),
            closed_at: topic.closed_at.clone(),
            source_session: source_session.to_string(),
        }
    }

    pub fn has_placeholder_summary(&self) -> bool {
        is_placeholder_summary(Some(&self.summary))
    }

    /// Text to embed: the summary, or the name while the summary is a placeholder.
    pub fn embedding_source(&self) -> &str {
        if self.has_placeholder_summary() {
            &self.name
        } else {
            &self.summary
        }
    }
}

/// A durable claim about the user, keyed by field name in the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub value: String,
    pub importance: u8,
    pub updated_at: String,
}

// --- Structured outputs ---

/// Combined topic name and summary produced when a topic closes.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicLabel {
    /// Two to four word topic label.
    pub label: String,
    /// Two to four sentence summary of the thread.
    pub summary: String,
}

/// LLM verdict on whether a message starts a new topic.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicSwitchDecision {
    /// True when the message clearly changes the subject.
    pub switch: bool,
    /// Short name for the new topic when `switch` is true.
    #[serde(default)]
    pub topic: String,
}

/// A fact proposed by the extraction call.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ExtractedFact {
    /// Fact key, e.g. `name` or `employer`.
    #[serde(alias = "key")]
    pub field: String,
    /// Concrete value stated by the user.
    pub value: String,
    /// Importance and permanence from 1 (temporary) to 10 (stable).
    pub importance: i64,
}

/// All facts proposed for one user turn.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FactsResponse {
    #[serde(default)]
    pub facts: Vec<ExtractedFact>,
}

/// Rewritten notepad text.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NotepadUpdate {
    /// Plain text notepad content.
    pub updated_notepad: String,
}
