// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational memory for Topica.
//!
//! A session's conversation is split into topics. An embedding-similarity
//! gate with LLM confirmation decides when a new topic starts; closed topics
//! are summarized on background tasks. Each turn draws context from two
//! tiers:
//!
//! - short-term: the open topic, every closed topic's summary, and the full
//!   threads of the closed topics most similar to the query;
//! - long-term: the user's fact table, the notepad, and the summaries of the
//!   most similar topics archived by earlier sessions.

pub mod embedding;
pub mod extractor;
pub mod long_term;
pub mod notepad;
pub mod prompts;
pub mod retriever;
pub mod shift;
pub mod short_term;
pub mod similarity;
pub mod store;
pub mod structured;
pub mod summarizer;
pub mod topic_store;
pub mod types;

pub use extractor::FactExtractor;
pub use long_term::{ClearScope, FactPolicy, LongTermStore, ReconcileReport, UserMemorySnapshot};
pub use notepad::NotepadReflector;
pub use retriever::{LongTermContext, LongTermRetriever};
pub use shift::{ShiftDecision, ShiftDetector, ShiftOutcome, ShiftStage};
pub use short_term::{ShortTermContext, ShortTermRetriever};
pub use store::{FileStore, MemoryStorage, SessionRecord};
pub use structured::{RetryPolicy, generate_structured, generate_text};
pub use summarizer::{PendingSummary, Summarizer, SummaryWait};
pub use topic_store::TopicStore;
pub use types::{Exchange, Fact, Role, Topic, TopicState, TopicSummary};
