// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Topica.
//!
//! Foundational trait definitions, error types, and common types shared by
//! the memory engine, the session orchestrator, and provider adapters.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ProviderErrorKind, TopicaError};
pub use types::{AdapterType, HealthStatus};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topica_error_has_all_variants() {
        let _config = TopicaError::Config("test".into());
        let _storage = TopicaError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = TopicaError::provider(ProviderErrorKind::Transport, "down");
        let _validation = TopicaError::Validation {
            schema: "FactsResponse".into(),
            message: "missing field".into(),
        };
        let _timeout = TopicaError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = TopicaError::Internal("test".into());
    }

    #[test]
    fn retryable_classification() {
        assert!(TopicaError::provider(ProviderErrorKind::RateLimited, "slow down").is_retryable());
        assert!(TopicaError::provider(ProviderErrorKind::Timeout, "late").is_retryable());
        assert!(!TopicaError::provider(ProviderErrorKind::Transport, "401").is_retryable());
        assert!(
            TopicaError::Validation {
                schema: "TopicLabel".into(),
                message: "bad json".into(),
            }
            .is_retryable()
        );
        assert!(!TopicaError::Config("bad".into()).is_retryable());
    }

    #[test]
    fn provider_error_kind_round_trips_through_strings() {
        use std::str::FromStr;

        for kind in [
            ProviderErrorKind::Timeout,
            ProviderErrorKind::MalformedOutput,
            ProviderErrorKind::RateLimited,
            ProviderErrorKind::Transport,
        ] {
            let parsed = ProviderErrorKind::from_str(&kind.to_string()).expect("should parse back");
            assert_eq!(kind, parsed);
        }
        assert_eq!(ProviderErrorKind::RateLimited.to_string(), "rate_limited");
    }

    #[test]
    fn provider_request_carries_schema_name() {
        let plain = types::ProviderRequest::text("hello");
        assert_eq!(plain.schema_name(), None);

        let structured = types::ProviderRequest::structured(
            "hello",
            types::ResponseFormat {
                name: "FactsResponse".into(),
                schema: serde_json::json!({"type": "object"}),
            },
        );
        assert_eq!(structured.schema_name(), Some("FactsResponse"));
        assert_eq!(structured.max_tokens, 2048);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
    }
}
