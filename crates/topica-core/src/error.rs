// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Topica.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Classification of a failed provider call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The call did not complete within its deadline.
    Timeout,
    /// The provider answered, but the body could not be decoded.
    MalformedOutput,
    /// The provider rejected the call because of rate limits (HTTP 429).
    RateLimited,
    /// Connection, TLS, or non-success HTTP status.
    Transport,
}

impl ProviderErrorKind {
    /// Whether a retry with the same input may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Timeout
                | ProviderErrorKind::MalformedOutput
                | ProviderErrorKind::RateLimited
        )
    }
}

/// The primary error type used across all Topica adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TopicaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence errors. Fatal for the save step that raised them only.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM or embedding provider errors.
    #[error("provider error ({kind}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Structured output did not match the requested schema.
    #[error("validation error for `{schema}`: {message}")]
    Validation { schema: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TopicaError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        TopicaError::Provider {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same call with the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TopicaError::Provider { kind, .. } => kind.is_transient(),
            TopicaError::Validation { .. } | TopicaError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Wrap any I/O or serialization failure as a storage error.
pub fn storage_err<E>(e: E) -> TopicaError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TopicaError::Storage {
        source: Box::new(e),
    }
}
