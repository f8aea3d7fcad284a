// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapters for Topica.
//!
//! [`OpenAiProvider`] implements [`ProviderAdapter`] over chat completions,
//! sending a `json_schema` response format when the request carries one.
//! [`OpenAiEmbedder`] implements [`EmbeddingAdapter`] over `/embeddings`.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use topica_config::model::ProviderConfig;
use topica_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, ProviderRequest, ProviderResponse,
};
use topica_core::{
    EmbeddingAdapter, PluginAdapter, ProviderAdapter, ProviderErrorKind, TopicaError,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ApiResponseFormat, ChatMessage, ChatRequest, EmbeddingRequest, JsonSchemaSpec,
};

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Resolve the API key: config first, then `OPENAI_API_KEY`.
pub fn resolve_api_key(configured: Option<&str>) -> Result<String, TopicaError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(API_KEY_ENV).map_err(|_| {
        TopicaError::Config(format!(
            "no API key: set provider.api_key in topica.toml or the {API_KEY_ENV} environment variable"
        ))
    })
}

fn client_from_config(config: &ProviderConfig) -> Result<OpenAiClient, TopicaError> {
    let api_key = resolve_api_key(config.api_key.as_deref())?;
    OpenAiClient::new(
        &api_key,
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// Chat completions provider.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, TopicaError> {
        let client = client_from_config(config)?;
        info!(model = %config.chat_model, base_url = %config.base_url, "chat provider initialized");
        Ok(Self::with_client(client, config.chat_model.clone()))
    }

    pub fn with_client(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }

    fn to_chat_request(&self, request: ProviderRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.unwrap_or_else(|| self.model.clone()),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            response_format: request.response_format.map(|f| ApiResponseFormat {
                type_: "json_schema".into(),
                json_schema: JsonSchemaSpec {
                    name: f.name,
                    schema: f.schema,
                    strict: false,
                },
            }),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, TopicaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TopicaError> {
        debug!("openai provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, TopicaError> {
        let response = self.client.chat(&self.to_chat_request(request)).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                TopicaError::provider(ProviderErrorKind::MalformedOutput, "response had no message content")
            })?;

        Ok(ProviderResponse {
            content,
            model: response.model,
        })
    }
}

/// Embeddings provider.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &ProviderConfig) -> Result<Self, TopicaError> {
        let client = client_from_config(config)?;
        info!(model = %config.embedding_model, "embedding provider initialized");
        Ok(Self::with_client(client, config.embedding_model.clone()))
    }

    pub fn with_client(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, TopicaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TopicaError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, TopicaError> {
        let expected = input.texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: input.texts,
        };
        let mut data = self.client.embeddings(&request).await?.data;
        if data.len() != expected {
            return Err(TopicaError::provider(
                ProviderErrorKind::MalformedOutput,
                format!("expected {expected} embeddings, got {}", data.len()),
            ));
        }
        data.sort_by_key(|d| d.index);

        let dimensions = data.first().map_or(0, |d| d.embedding.len());
        Ok(EmbeddingOutput {
            embeddings: data.into_iter().map(|d| d.embedding).collect(),
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topica_core::types::ResponseFormat;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("k", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn configured_key_wins() {
        assert_eq!(resolve_api_key(Some("sk-config")).unwrap(), "sk-config");
    }

    #[tokio::test]
    async fn structured_request_carries_json_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {"name": "TopicLabel"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "choices": [{"message": {"content": "{\"label\": \"x\", \"summary\": \"y\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_client(client(&server), "gpt-4o-mini".into());
        let request = ProviderRequest::structured(
            "label this",
            ResponseFormat {
                name: "TopicLabel".into(),
                schema: serde_json::json!({"type": "object"}),
            },
        );
        let response = provider.complete(request).await.unwrap();
        assert!(response.content.contains("label"));
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::with_client(client(&server), "m".into());
        let err = provider.complete(ProviderRequest::text("hi")).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn embeddings_are_returned_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::with_client(client(&server), "text-embedding-3-small".into());
        let output = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(output.dimensions, 2);
    }

    #[tokio::test]
    async fn embedding_count_mismatch_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::with_client(client(&server), "m".into());
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TopicaError::Provider { kind: ProviderErrorKind::MalformedOutput, .. }
        ));
    }
}
