// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter.
//!
//! Each axis is a list of keywords; a text's coordinate on an axis is the
//! number of that axis's keywords it contains (case-insensitive). Texts that
//! share no keywords with any axis embed as the zero vector, which has
//! similarity 0 with everything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use topica_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use topica_core::{EmbeddingAdapter, PluginAdapter, ProviderErrorKind, TopicaError};

pub struct MockEmbedder {
    axes: Vec<Vec<String>>,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockEmbedder {
    pub fn new(axes: &[&[&str]]) -> Self {
        Self {
            axes: axes
                .iter()
                .map(|axis| axis.iter().map(|k| k.to_lowercase()).collect())
                .collect(),
            overrides: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Pin the embedding of an exact (trimmed) text.
    pub fn with_override(self, text: &str, vector: Vec<f32>) -> Self {
        self.set_override(text, vector);
        self
    }

    pub fn set_override(&self, text: &str, vector: Vec<f32>) {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.insert(text.trim().to_string(), vector);
        }
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    /// The vector for a single text.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Ok(overrides) = self.overrides.lock()
            && let Some(v) = overrides.get(text.trim())
        {
            return v.clone();
        }
        let lower = text.to_lowercase();
        self.axes
            .iter()
            .map(|axis| axis.iter().filter(|k| lower.contains(k.as_str())).count() as f32)
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
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
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, TopicaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TopicaError::provider(
                ProviderErrorKind::Transport,
                "mock embedder set to fail",
            ));
        }
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_axes() {
        let embedder = MockEmbedder::new(&[&["neural", "network"], &["waffle"]]);
        assert_eq!(embedder.vector_for("Neural network layers"), vec![2.0, 0.0]);
        assert_eq!(embedder.vector_for("Waffle House"), vec![0.0, 1.0]);
        assert_eq!(embedder.vector_for("hello"), vec![0.0, 0.0]);
    }

    #[test]
    fn overrides_take_precedence() {
        let embedder = MockEmbedder::new(&[&["neural"], &["waffle"]])
            .with_override("what were the questions I had before", vec![1.0, 0.0]);
        assert_eq!(
            embedder.vector_for("  what were the questions I had before "),
            vec![1.0, 0.0]
        );
    }

    #[tokio::test]
    async fn failing_embedder_errors_and_counts_calls() {
        let embedder = MockEmbedder::new(&[&["x"]]);
        embedder.set_failing(true);
        let result = embedder
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await;
        assert!(result.is_err());
        assert_eq!(embedder.calls(), 1);
    }
}
