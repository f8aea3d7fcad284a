// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible APIs.
//!
//! The client makes exactly one attempt per call. Retries belong to the
//! caller, which knows whether the same input may be resent.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use topica_core::{ProviderErrorKind, TopicaError};
use tracing::debug;

use crate::types::{
    ApiErrorResponse, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, TopicaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| TopicaError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TopicaError::Provider {
                kind: ProviderErrorKind::Transport,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TopicaError> {
        self.post("chat/completions", request).await
    }

    pub async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, TopicaError> {
        self.post("embeddings", request).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<R, TopicaError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = %status, endpoint, "response received");
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| TopicaError::Provider {
            kind: ProviderErrorKind::MalformedOutput,
            message: format!("failed to parse {endpoint} response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn transport_error(e: reqwest::Error) -> TopicaError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Transport
    };
    TopicaError::Provider {
        kind,
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn status_error(status: StatusCode, body: &str) -> TopicaError {
    let kind = if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderErrorKind::RateLimited
    } else {
        ProviderErrorKind::Transport
    };
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "API error {status} ({}): {}",
            api_err.error.type_.as_deref().unwrap_or("unknown"),
            api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    };
    TopicaError::provider(kind, message)
}
