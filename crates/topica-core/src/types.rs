// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
}

// --- Provider types ---

/// JSON schema the provider is asked to conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Schema name, also used to route mock responses in tests.
    pub name: String,
    /// JSON schema document.
    pub schema: serde_json::Value,
}

/// A single-prompt request to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model override. `None` uses the adapter default.
    pub model: Option<String>,
    /// Full prompt text.
    pub prompt: String,
    /// Structured output schema. `None` requests free text.
    pub response_format: Option<ResponseFormat>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl ProviderRequest {
    /// Free-text request with default model and token limit.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            response_format: None,
            max_tokens: 2048,
        }
    }

    /// Request constrained to the given response schema.
    pub fn structured(prompt: impl Into<String>, format: ResponseFormat) -> Self {
        Self {
            response_format: Some(format),
            ..Self::text(prompt)
        }
    }

    /// Name of the requested schema, if any.
    pub fn schema_name(&self) -> Option<&str> {
        self.response_format.as_ref().map(|f| f.name.as_str())
    }
}

/// A response from an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text (JSON text when a response format was requested).
    pub content: String,
    /// Model that produced the response.
    pub model: String,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter. One vector per input text, same order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}
