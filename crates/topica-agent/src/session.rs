// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle and the per-turn memory protocol.
//!
//! A session goes through states: NoSession -> Active -> Ended.
//!
//! Each turn:
//! 1. applies finished topic summaries (bounded wait) while the query is
//!    embedded;
//! 2. retrieves short-term and long-term context;
//! 3. generates the response while fact extraction runs on its own task;
//! 4. appends the exchange pair, closing the open topic first if the pair
//!    would overflow it;
//! 5. runs shift detection and moves the pair into a new topic on a shift;
//! 6. merges extracted facts.
//!
//! Provider failures never abort a turn. Only persistence errors surface,
//! from [`SessionOrchestrator::end_session`].

use std::sync::Arc;
use std::time::Duration;

use topica_config::TopicaConfig;
use topica_core::{EmbeddingAdapter, ProviderAdapter, TopicaError};
use topica_memory::embedding::{embed_batch, embed_text};
use topica_memory::long_term::{ClearScope, FactMergeReport, FactPolicy};
use topica_memory::shift::CANDIDATE_PAIR;
use topica_memory::store::{SessionRecord, validate_username};
use topica_memory::types::now_timestamp;
use topica_memory::{
    Exchange, FactExtractor, LongTermContext, LongTermRetriever, LongTermStore, MemoryStorage,
    NotepadReflector, PendingSummary, RetryPolicy, ShiftDetector, ShiftOutcome, ShortTermContext,
    ShortTermRetriever, Summarizer, SummaryWait, TopicStore, generate_text,
};
use tracing::{debug, info, warn};

use crate::context;

/// Reply used when response generation fails.
pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I couldn't generate a response just now. Please try again.";

/// States in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been started.
    NoSession,
    /// Accepting turns.
    Active,
    /// Closed and persisted (or persistence attempted).
    Ended,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::NoSession => write!(f, "no_session"),
            SessionState::Active => write!(f, "active"),
            SessionState::Ended => write!(f, "ended"),
        }
    }
}

/// One conversation with one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub session_id: String,
    pub session_number: u32,
    pub topics: TopicStore,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Context handed to the response call for one turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub short_term: ShortTermContext,
    pub long_term: LongTermContext,
}

/// What happened during one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub context: TurnContext,
    /// `None` when shift detection did not run.
    pub shift: Option<ShiftOutcome>,
    /// Ids of topics closed during this turn.
    pub closed_topics: Vec<String>,
    pub facts: FactMergeReport,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: String,
    pub topics_archived: usize,
    pub notepad_updated: bool,
}

/// Owns one user's session and long-term memory and runs the turn protocol.
pub struct SessionOrchestrator {
    state: SessionState,
    provider: Arc<dyn ProviderAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    storage: Arc<dyn MemoryStorage>,
    detector: ShiftDetector,
    summarizer: Arc<Summarizer>,
    extractor: Arc<FactExtractor>,
    reflector: NotepadReflector,
    short_term: ShortTermRetriever,
    long_term_retriever: LongTermRetriever,
    retry: RetryPolicy,
    system_prompt: String,
    fact_policy: FactPolicy,
    max_context_chars: usize,
    min_shift_exchanges: usize,
    summary_wait: Duration,
    placeholder_retry_limit: usize,
    session: Option<Session>,
    long_term: Option<LongTermStore>,
    pending: Vec<PendingSummary>,
}

impl SessionOrchestrator {
    pub fn new(
        config: &TopicaConfig,
        provider: Arc<dyn ProviderAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        storage: Arc<dyn MemoryStorage>,
    ) -> Self {
        let memory = &config.memory;
        let retry = RetryPolicy::from_config(&config.provider);

        Self {
            state: SessionState::NoSession,
            detector: ShiftDetector::new(provider.clone(), embedder.clone(), memory, retry.clone()),
            summarizer: Arc::new(Summarizer::new(provider.clone(), embedder.clone(), retry.clone())),
            extractor: Arc::new(FactExtractor::new(provider.clone(), retry.clone())),
            reflector: NotepadReflector::new(provider.clone(), memory, retry.clone()),
            short_term: ShortTermRetriever::new(memory),
            long_term_retriever: LongTermRetriever::new(memory),
            system_prompt: config.agent.system_prompt.clone(),
            fact_policy: FactPolicy {
                importance_threshold: memory.fact_importance_threshold,
                capacity: memory.fact_capacity,
            },
            max_context_chars: memory.max_context_chars,
            min_shift_exchanges: memory.min_exchanges_for_shift,
            summary_wait: Duration::from_millis(memory.summary_wait_ms),
            placeholder_retry_limit: memory.placeholder_retry_limit,
            retry,
            provider,
            embedder,
            storage,
            session: None,
            long_term: None,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn long_term(&self) -> Option<&LongTermStore> {
        self.long_term.as_ref()
    }

    /// Load the user's memory and open a new session.
    pub async fn start_session(&mut self, username: &str) -> Result<&Session, TopicaError> {
        if self.state == SessionState::Active {
            return Err(TopicaError::Internal("a session is already active".into()));
        }
        validate_username(username)?;

        let snapshot = self.storage.load_user(username).await?;
        let (mut long_term, report) = LongTermStore::from_snapshot(username, snapshot);
        if !report.is_clean() {
            warn!(
                user = username,
                dangling = report.dangling_embeddings.len(),
                missing = report.missing_embeddings.len(),
                "archive and embeddings disagreed on load"
            );
        }
        self.repair_archive(&mut long_term).await;

        let session_number = self.storage.next_session_number(username).await?;
        let session_id = format!("{username}.{session_number}");
        info!(user = username, session_id = %session_id, "session started");

        self.pending.clear();
        self.long_term = Some(long_term);
        self.state = SessionState::Active;
        Ok(self.session.insert(Session {
            username: username.to_string(),
            topics: TopicStore::new(session_id.clone()),
            session_id,
            session_number,
            started_at: now_timestamp(),
            ended_at: None,
        }))
    }

    /// Retry placeholder summaries and fill in missing embeddings.
    async fn repair_archive(&self, long_term: &mut LongTermStore) {
        let stale: Vec<(String, Vec<Exchange>, String)> = long_term
            .placeholder_topics(self.placeholder_retry_limit)
            .into_iter()
            .map(|t| (t.id.clone(), t.exchanges.clone(), t.name.clone()))
            .collect();
        if !stale.is_empty() {
            let summaries = futures::future::join_all(
                stale
                    .iter()
                    .map(|(_, exchanges, name)| self.summarizer.summarize(exchanges, Some(name.as_str()))),
            )
            .await;
            for ((id, _, _), summary) in stale.iter().zip(summaries) {
                if long_term.update_archived_summary(id, summary) {
                    info!(topic_id = %id, "re-summarized archived topic");
                }
            }
        }

        let missing: Vec<(String, String)> = long_term
            .topics_missing_embeddings()
            .into_iter()
            .map(|t| (t.id.clone(), t.embedding_source().to_string()))
            .collect();
        if missing.is_empty() {
            return;
        }
        let texts = missing.iter().map(|(_, text)| text.clone()).collect();
        match embed_batch(self.embedder.as_ref(), texts).await {
            Ok(vectors) => {
                for ((id, _), vector) in missing.iter().zip(vectors) {
                    long_term.set_embedding(id, vector);
                }
                info!(count = missing.len(), "re-embedded archived topics");
            }
            Err(e) => warn!(error = %e, "re-embedding archived topics failed"),
        }
    }

    /// Run one user turn and return the assistant's reply.
    pub async fn handle_turn(&mut self, user_text: &str) -> Result<TurnOutcome, TopicaError> {
        let (Some(session), Some(long_term)) = (self.session.as_mut(), self.long_term.as_mut()) else {
            return Err(TopicaError::Internal(format!("no active session (state: {})", self.state)));
        };
        if self.state != SessionState::Active {
            return Err(TopicaError::Internal(format!("no active session (state: {})", self.state)));
        }

        let (query_embedding, applied) = tokio::join!(
            embed_text(self.embedder.as_ref(), user_text),
            settle_pending(&mut self.pending, &mut session.topics, self.summary_wait),
        );
        let query_embedding = match query_embedding {
            Ok(v) if !v.is_empty() => Some(v),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "query embedding failed, retrieving without similarity");
                None
            }
        };
        debug!(applied, "summaries applied before retrieval");

        let context = TurnContext {
            short_term: self.short_term.retrieve(query_embedding.as_deref(), &session.topics),
            long_term: self
                .long_term_retriever
                .retrieve(query_embedding.as_deref(), long_term, &session.session_id),
        };
        let prompt = context::build_response_prompt(
            &self.system_prompt,
            &context.short_term,
            &context.long_term,
            user_text,
        );

        let extraction = self.extractor.spawn(user_text.to_string());
        let response = match generate_text(self.provider.as_ref(), &prompt, &self.retry).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "response generation failed");
                FALLBACK_RESPONSE.to_string()
            }
        };

        let mut closed_topics = Vec::new();
        if let Some(topic) = session.topics.append_pair(
            Exchange::user(user_text),
            Exchange::assistant(response.as_str()),
            self.max_context_chars,
        ) {
            closed_topics.push(topic.id.clone());
            self.pending.push(self.summarizer.spawn(topic));
        }

        let shift = match session.topics.open_topic() {
            Some(open) if open.len() >= self.min_shift_exchanges && !user_text.trim().is_empty() => {
                Some(self.detector.detect(open, user_text).await)
            }
            _ => None,
        };
        if let Some(outcome) = shift.as_ref().filter(|o| o.is_new_topic())
            && let Some(topic) = session
                .topics
                .split_open(CANDIDATE_PAIR, outcome.suggested_name.clone())
        {
            closed_topics.push(topic.id.clone());
            self.pending.push(self.summarizer.spawn(topic));
        }

        let facts = match extraction.await {
            Ok(Ok(extracted)) => long_term.merge_facts(&extracted, self.fact_policy),
            Ok(Err(e)) => {
                warn!(error = %e, "fact extraction failed");
                FactMergeReport::default()
            }
            Err(e) => {
                warn!(error = %e, "fact extraction task failed");
                FactMergeReport::default()
            }
        };

        Ok(TurnOutcome {
            response,
            context,
            shift,
            closed_topics,
            facts,
        })
    }

    /// Close the session: finish summaries, reflect on the notepad, archive
    /// the session's topics, and persist.
    ///
    /// The session is `Ended` even when persistence fails; call
    /// [`SessionOrchestrator::persist`] to retry the write.
    pub async fn end_session(&mut self) -> Result<SessionReport, TopicaError> {
        let (Some(session), Some(long_term)) = (self.session.as_mut(), self.long_term.as_mut()) else {
            return Err(TopicaError::Internal(format!("no active session (state: {})", self.state)));
        };
        if self.state != SessionState::Active {
            return Err(TopicaError::Internal(format!("no active session (state: {})", self.state)));
        }

        settle_pending(&mut self.pending, &mut session.topics, self.summary_wait).await;
        for pending in self.pending.drain(..) {
            warn!(topic_id = %pending.topic_id, "summary still running at session end, keeping placeholder");
            pending.abort();
        }

        if let Some(topic) = session.topics.close_open() {
            let summary = self.summarizer.summarize(&topic.exchanges, topic.name.as_deref()).await;
            session.topics.apply_summary(&topic.id, summary);
        }

        let notepad_updated = match self
            .reflector
            .reflect(long_term.notepad(), session.topics.closed_topics())
            .await
        {
            Some(updated) => {
                long_term.set_notepad(updated);
                true
            }
            None => false,
        };

        let topics_archived =
            long_term.merge_session_topics(session.topics.closed_topics(), &session.session_id);
        session.ended_at = Some(now_timestamp());
        self.state = SessionState::Ended;

        let report = SessionReport {
            session_id: session.session_id.clone(),
            topics_archived,
            notepad_updated,
        };
        info!(
            session_id = %report.session_id,
            topics = report.topics_archived,
            notepad_updated,
            "session ended"
        );

        self.persist().await?;
        Ok(report)
    }

    /// Write the session record and the user's long-term memory.
    pub async fn persist(&self) -> Result<(), TopicaError> {
        let (Some(session), Some(long_term)) = (self.session.as_ref(), self.long_term.as_ref()) else {
            return Err(TopicaError::Internal("nothing to persist".into()));
        };

        let record = SessionRecord {
            session_id: session.session_id.clone(),
            session_number: session.session_number,
            started_at: session.started_at.clone(),
            ended_at: session.ended_at.clone(),
            topics: session.topics.non_empty_topics().cloned().collect(),
        };
        self.storage.save_session(&session.username, &record).await?;
        self.storage.save_user(&session.username, &long_term.snapshot()).await
    }

    /// Clear parts of the current user's long-term memory, in memory and
    /// on disk.
    pub async fn forget(&mut self, scope: ClearScope) -> Result<(), TopicaError> {
        let Some(long_term) = self.long_term.as_mut() else {
            return Err(TopicaError::Internal("no user loaded".into()));
        };
        long_term.clear(scope);
        let username = long_term.username().to_string();
        self.storage.clear_user(&username, scope).await
    }
}

/// Apply finished summaries, waiting at most `limit` overall. Summaries
/// still running stay pending. Returns the number applied.
async fn settle_pending(pending: &mut Vec<PendingSummary>, topics: &mut TopicStore, limit: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + limit;
    let mut still_running = Vec::new();
    let mut applied = 0;

    for mut summary in pending.drain(..) {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match summary.wait(remaining).await {
            SummaryWait::Ready(result) => {
                if topics.apply_summary(&summary.topic_id, result) {
                    applied += 1;
                }
            }
            SummaryWait::Failed => {}
            SummaryWait::Pending => {
                warn!(topic_id = %summary.topic_id, "summary not ready, using placeholder");
                still_running.push(summary);
            }
        }
    }

    *pending = still_running;
    applied
}
