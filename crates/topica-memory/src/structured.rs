// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-constrained LLM calls with bounded retry.
//!
//! Every structured call sends the JSON schema of the target type, parses
//! the reply, and retries the same input on transient provider errors and
//! parse failures. Each attempt is bounded by a timeout.

use std::future::Future;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use topica_config::model::ProviderConfig;
use topica_core::types::{ProviderRequest, ResponseFormat};
use topica_core::{ProviderAdapter, ProviderErrorKind, TopicaError};
use tracing::{debug, warn};

/// A type the LLM can be asked to produce.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + 'static {}

impl<T> StructuredOutput for T where T: DeserializeOwned + JsonSchema + Send + 'static {}

/// Bounded retry with linear backoff and a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Delay before the given (1-based) attempt.
    fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff * attempt.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}

/// Run `call` until it succeeds, fails permanently, or attempts run out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut call: F) -> Result<T, TopicaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TopicaError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(TopicaError::provider(
                ProviderErrorKind::Timeout,
                format!("{label}: no response within {:?}", policy.timeout),
            )),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(call = label, attempt, error = %e, "retrying provider call");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| TopicaError::Internal(format!("{label}: no attempts made"))))
}

/// The response format advertised for `T`.
pub fn response_format<T: JsonSchema>() -> ResponseFormat {
    let schema = schemars::schema_for!(T);
    ResponseFormat {
        name: T::schema_name().to_string(),
        schema: serde_json::to_value(&schema).unwrap_or_default(),
    }
}

/// Ask the provider for a `T` and parse the reply.
pub async fn generate_structured<T: StructuredOutput>(
    provider: &dyn ProviderAdapter,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<T, TopicaError> {
    let format = response_format::<T>();
    let label = format.name.clone();

    with_retry(policy, &label, || {
        let request = ProviderRequest::structured(prompt, format.clone());
        let schema = format.name.clone();
        async move {
            let response = provider.complete(request).await?;
            parse_structured::<T>(&schema, &response.content)
        }
    })
    .await
}

/// Free-text generation with the same retry and timeout handling.
pub async fn generate_text(
    provider: &dyn ProviderAdapter,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, TopicaError> {
    with_retry(policy, "text", || async move {
        let response = provider.complete(ProviderRequest::text(prompt)).await?;
        Ok(response.content)
    })
    .await
}

/// Parse a structured reply, tolerating markdown code fences and prose
/// around the JSON object.
pub fn parse_structured<T: DeserializeOwned>(schema: &str, content: &str) -> Result<T, TopicaError> {
    let json = extract_json_object(content);
    serde_json::from_str(json).map_err(|e| {
        debug!(schema, content = %content, "structured output did not parse");
        TopicaError::Validation {
            schema: schema.to_string(),
            message: e.to_string(),
        }
    })
}

fn extract_json_object(content: &str) -> &str {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FactsResponse, TopicLabel, TopicSwitchDecision};
    use topica_test_utils::MockProvider;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempt_times_out_and_is_retried() {
        let provider = MockProvider::new();
        let label = r#"{"label": "Rust", "summary": "Talked about Rust."}"#;
        provider
            .push_delayed_response("TopicLabel", label, Duration::from_secs(60))
            .await;
        provider.push_response("TopicLabel", label).await;

        let result: TopicLabel = generate_structured(&provider, "p", &fast_policy(2)).await.unwrap();
        assert_eq!(result.label, "Rust");
        assert_eq!(provider.calls_for("TopicLabel").await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempts_end_in_timeout_error() {
        let provider = MockProvider::new();
        for _ in 0..2 {
            provider
                .push_delayed_response("TopicLabel", "{}", Duration::from_secs(60))
                .await;
        }

        let start = tokio::time::Instant::now();
        let err = generate_structured::<TopicLabel>(&provider, "p", &fast_policy(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicaError::Provider {
                kind: ProviderErrorKind::Timeout,
                ..
            }
        ));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn response_format_is_named_after_the_type() {
        let format = response_format::<TopicSwitchDecision>();
        assert_eq!(format.name, "TopicSwitchDecision");
        assert!(format.schema["properties"]["switch"].is_object());
    }

    #[test]
    fn parses_fenced_json() {
        let label: TopicLabel = parse_structured(
            "TopicLabel",
            "```json\n{\"label\": \"Rust\", \"summary\": \"Talked about Rust.\"}\n```",
        )
        .unwrap();
        assert_eq!(label.label, "Rust");
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let facts: FactsResponse =
            parse_structured("FactsResponse", "Here you go: {\"facts\": []} hope it helps").unwrap();
        assert!(facts.facts.is_empty());
    }

    #[test]
    fn invalid_json_is_a_validation_error() {
        let err = parse_structured::<TopicLabel>("TopicLabel", "not json").unwrap_err();
        assert!(matches!(err, TopicaError::Validation { ref schema, .. } if schema == "TopicLabel"));
    }

    #[tokio::test]
    async fn malformed_output_is_retried_with_same_prompt() {
        let provider = MockProvider::new();
        provider.push_response("TopicSwitchDecision", "garbage").await;
        provider
            .push_response("TopicSwitchDecision", r#"{"switch": true, "topic": "Food"}"#)
            .await;

        let decision: TopicSwitchDecision =
            generate_structured(&provider, "decide", &fast_policy(3)).await.unwrap();
        assert!(decision.switch);

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt, requests[1].prompt);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = MockProvider::new();
        for _ in 0..5 {
            provider.push_error("TopicLabel", ProviderErrorKind::RateLimited).await;
        }

        let err = generate_structured::<TopicLabel>(&provider, "label", &fast_policy(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicaError::Provider { kind: ProviderErrorKind::RateLimited, .. }
        ));
        assert_eq!(provider.calls_for("TopicLabel").await, 3);
    }

    #[tokio::test]
    async fn transport_errors_are_not_retried() {
        let provider = MockProvider::new();
        provider.push_error("TopicLabel", ProviderErrorKind::Transport).await;

        let result = generate_structured::<TopicLabel>(&provider, "label", &fast_policy(3)).await;
        assert!(result.is_err());
        assert_eq!(provider.calls_for("TopicLabel").await, 1);
    }

    #[tokio::test]
    async fn text_generation_returns_content() {
        let provider = MockProvider::new();
        provider.push_text("hello there").await;
        let text = generate_text(&provider, "hi", &fast_policy(1)).await.unwrap();
        assert_eq!(text, "hello there");
    }
}
