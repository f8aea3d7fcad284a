// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express, such
//! as similarity thresholds inside `[0, 1]` and non-zero retrieval caps.

use crate::diagnostic::ConfigError;
use crate::model::TopicaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &TopicaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let memory = &config.memory;

    for (name, value) in [
        ("memory.shift_similarity_threshold", memory.shift_similarity_threshold),
        ("memory.short_term_threshold", memory.short_term_threshold),
        ("memory.long_term_threshold", memory.long_term_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be within [0.0, 1.0], got {value}"),
            });
        }
    }

    for (name, value) in [
        ("memory.short_term_max_k", memory.short_term_max_k),
        ("memory.long_term_max_k", memory.long_term_max_k),
        ("memory.fact_capacity", memory.fact_capacity),
        ("memory.shift_context_exchanges", memory.shift_context_exchanges),
        ("memory.max_context_chars", memory.max_context_chars),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be at least 1"),
            });
        }
    }

    if !(1..=10).contains(&memory.fact_importance_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.fact_importance_threshold must be within 1..=10, got {}",
                memory.fact_importance_threshold
            ),
        });
    }

    if config.provider.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: "provider.max_attempts must be at least 1".to_string(),
        });
    }

    if config.provider.request_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.request_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.provider.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "provider.base_url must not be empty".to_string(),
        });
    }

    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.data_dir must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
