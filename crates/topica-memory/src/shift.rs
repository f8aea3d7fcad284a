// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-stage topic shift detection.
//!
//! A cheap embedding-similarity gate answers most turns. Only when the new
//! message looks dissimilar from the recent context is the LLM asked to
//! confirm, and its answer is final. Any failure keeps the current topic.

use std::sync::Arc;

use strum::Display;
use topica_config::model::MemoryConfig;
use topica_core::{EmbeddingAdapter, ProviderAdapter};
use tracing::{debug, info, warn};

use crate::embedding::embed_batch;
use crate::prompts;
use crate::similarity::cosine_similarity;
use crate::structured::{RetryPolicy, generate_structured};
use crate::types::{Exchange, Topic, TopicSwitchDecision, format_transcript};

/// Number of trailing exchanges in the open topic that belong to the
/// candidate turn (user message plus assistant reply).
pub const CANDIDATE_PAIR: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftDecision {
    SameTopic,
    NewTopic,
}

/// Which step of the algorithm produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShiftStage {
    /// The open topic is too short to split.
    BelowMinimum,
    /// The open topic exceeded the character ceiling. Topics grown through
    /// [`TopicStore::append_pair`](crate::TopicStore::append_pair) close
    /// before they overflow, so only callers that build topics directly
    /// reach this stage.
    CharCeiling,
    /// Similarity was above the threshold; no LLM call.
    SimilarityGate,
    /// The LLM answered.
    LlmConfirmation,
    /// Embedding or LLM failed; the topic is kept.
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOutcome {
    pub decision: ShiftDecision,
    pub stage: ShiftStage,
    pub similarity: Option<f32>,
    /// Name the LLM suggested for the new topic.
    pub suggested_name: Option<String>,
}

impl ShiftOutcome {
    fn same(stage: ShiftStage, similarity: Option<f32>) -> Self {
        Self {
            decision: ShiftDecision::SameTopic,
            stage,
            similarity,
            suggested_name: None,
        }
    }

    pub fn is_new_topic(&self) -> bool {
        self.decision == ShiftDecision::NewTopic
    }
}

pub struct ShiftDetector {
    provider: Arc<dyn ProviderAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    retry: RetryPolicy,
    similarity_threshold: f32,
    min_exchanges: usize,
    context_exchanges: usize,
    max_context_chars: usize,
}

impl ShiftDetector {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: &MemoryConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            embedder,
            retry,
            similarity_threshold: config.shift_similarity_threshold,
            min_exchanges: config.min_exchanges_for_shift,
            context_exchanges: config.shift_context_exchanges,
            max_context_chars: config.max_context_chars,
        }
    }

    /// Decide whether `candidate` starts a new topic.
    ///
    /// `open_topic` is the open topic with the candidate turn already
    /// appended as its last [`CANDIDATE_PAIR`] exchanges; the context compared
    /// against is the exchanges before it.
    pub async fn detect(&self, open_topic: &Topic, candidate: &str) -> ShiftOutcome {
        if open_topic.len() < self.min_exchanges {
            return ShiftOutcome::same(ShiftStage::BelowMinimum, None);
        }

        if open_topic.char_count() > self.max_context_chars {
            info!(
                topic_id = %open_topic.id,
                chars = open_topic.char_count(),
                "open topic over character ceiling, forcing new topic"
            );
            return ShiftOutcome {
                decision: ShiftDecision::NewTopic,
                stage: ShiftStage::CharCeiling,
                similarity: None,
                suggested_name: None,
            };
        }

        let preceding = &open_topic.exchanges[..open_topic.len().saturating_sub(CANDIDATE_PAIR)];
        let context = &preceding[preceding.len().saturating_sub(self.context_exchanges)..];
        if context.is_empty() || candidate.trim().is_empty() {
            return ShiftOutcome::same(ShiftStage::BelowMinimum, None);
        }

        let similarity = match self.context_similarity(context, candidate).await {
            Some(s) => s,
            None => return ShiftOutcome::same(ShiftStage::Degraded, None),
        };
        debug!(
            similarity,
            threshold = self.similarity_threshold,
            "shift similarity"
        );

        if similarity > self.similarity_threshold {
            return ShiftOutcome::same(ShiftStage::SimilarityGate, Some(similarity));
        }

        self.confirm(context, candidate, similarity).await
    }

    async fn context_similarity(&self, context: &[Exchange], candidate: &str) -> Option<f32> {
        let context_text = context
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        match embed_batch(
            self.embedder.as_ref(),
            vec![context_text, candidate.to_string()],
        )
        .await
        {
            Ok(vectors) => Some(cosine_similarity(&vectors[0], &vectors[1])),
            Err(e) => {
                warn!(error = %e, "shift detection embedding failed, keeping topic");
                None
            }
        }
    }

    async fn confirm(&self, context: &[Exchange], candidate: &str, similarity: f32) -> ShiftOutcome {
        let prompt = prompts::topic_switch(&format_transcript(context), candidate);
        match generate_structured::<TopicSwitchDecision>(self.provider.as_ref(), &prompt, &self.retry).await {
            Ok(decision) if decision.switch => {
                let name = decision.topic.trim();
                info!(similarity, new_topic = name, "topic shift confirmed");
                ShiftOutcome {
                    decision: ShiftDecision::NewTopic,
                    stage: ShiftStage::LlmConfirmation,
                    similarity: Some(similarity),
                    suggested_name: (!name.is_empty()).then(|| name.to_string()),
                }
            }
            Ok(_) => {
                debug!(similarity, "llm kept the current topic");
                ShiftOutcome::same(ShiftStage::LlmConfirmation, Some(similarity))
            }
            Err(e) => {
                warn!(error = %e, "topic switch confirmation failed, keeping topic");
                ShiftOutcome::same(ShiftStage::Degraded, Some(similarity))
            }
        }
    }
}
