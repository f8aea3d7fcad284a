// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Topica configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TopicaConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Topic segmentation, retrieval, and fact settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// LLM and embedding provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Instruction line placed at the top of every response prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "topica".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

/// Topic segmentation, retrieval, and fact memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Stage-one similarity above which a new exchange stays in the open topic.
    #[serde(default = "default_shift_similarity_threshold")]
    pub shift_similarity_threshold: f32,

    /// Minimum exchanges in the open topic before shift detection runs.
    #[serde(default = "default_min_exchanges_for_shift")]
    pub min_exchanges_for_shift: usize,

    /// Number of most recent exchanges used as the open-topic context.
    #[serde(default = "default_shift_context_exchanges")]
    pub shift_context_exchanges: usize,

    /// Hard character ceiling for a single open topic.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Similarity above which a closed topic's full thread is retrieved in-session.
    #[serde(default = "default_short_term_threshold")]
    pub short_term_threshold: f32,

    /// Maximum full threads retrieved in-session.
    #[serde(default = "default_short_term_max_k")]
    pub short_term_max_k: usize,

    /// Similarity above which an archived topic summary is retrieved.
    #[serde(default = "default_long_term_threshold")]
    pub long_term_threshold: f32,

    /// Maximum archived summaries retrieved per turn.
    #[serde(default = "default_long_term_max_k")]
    pub long_term_max_k: usize,

    /// Minimum importance (1-10) for a fact to be stored.
    #[serde(default = "default_fact_importance_threshold")]
    pub fact_importance_threshold: u8,

    /// Maximum number of facts kept per user.
    #[serde(default = "default_fact_capacity")]
    pub fact_capacity: usize,

    /// Notepad characters injected into each prompt.
    #[serde(default = "default_notepad_context_chars")]
    pub notepad_context_chars: usize,

    /// Notepad length that triggers a compression call.
    #[serde(default = "default_notepad_max_chars")]
    pub notepad_max_chars: usize,

    /// Number of recent session topics shown to the notepad reflection call.
    #[serde(default = "default_notepad_topic_window")]
    pub notepad_topic_window: usize,

    /// Upper bound on waiting for a pending topic summary before retrieval.
    #[serde(default = "default_summary_wait_ms")]
    pub summary_wait_ms: u64,

    /// Archived placeholder summaries re-attempted at each session start.
    #[serde(default = "default_placeholder_retry_limit")]
    pub placeholder_retry_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            shift_similarity_threshold: default_shift_similarity_threshold(),
            min_exchanges_for_shift: default_min_exchanges_for_shift(),
            shift_context_exchanges: default_shift_context_exchanges(),
            max_context_chars: default_max_context_chars(),
            short_term_threshold: default_short_term_threshold(),
            short_term_max_k: default_short_term_max_k(),
            long_term_threshold: default_long_term_threshold(),
            long_term_max_k: default_long_term_max_k(),
            fact_importance_threshold: default_fact_importance_threshold(),
            fact_capacity: default_fact_capacity(),
            notepad_context_chars: default_notepad_context_chars(),
            notepad_max_chars: default_notepad_max_chars(),
            notepad_topic_window: default_notepad_topic_window(),
            summary_wait_ms: default_summary_wait_ms(),
            placeholder_retry_limit: default_placeholder_retry_limit(),
        }
    }
}

fn default_shift_similarity_threshold() -> f32 {
    0.45
}

fn default_min_exchanges_for_shift() -> usize {
    3
}

fn default_shift_context_exchanges() -> usize {
    3
}

fn default_max_context_chars() -> usize {
    25_000
}

fn default_short_term_threshold() -> f32 {
    0.75
}

fn default_short_term_max_k() -> usize {
    2
}

fn default_long_term_threshold() -> f32 {
    0.5
}

fn default_long_term_max_k() -> usize {
    3
}

fn default_fact_importance_threshold() -> u8 {
    7
}

fn default_fact_capacity() -> usize {
    100
}

fn default_notepad_context_chars() -> usize {
    2000
}

fn default_notepad_max_chars() -> usize {
    8000
}

fn default_notepad_topic_window() -> usize {
    5
}

fn default_summary_wait_ms() -> u64 {
    30_000
}

fn default_placeholder_retry_limit() -> usize {
    5
}

/// LLM and embedding provider configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for responses and structured calls.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Attempts per structured call (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step between attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-call deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory holding `sessions/` and `longterm_memory/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("topica"))
        .unwrap_or_else(|| std::path::PathBuf::from(".topica"))
        .to_string_lossy()
        .to_string()
}
