// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for session scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use topica_agent::SessionOrchestrator;
use topica_config::TopicaConfig;
use topica_memory::FileStore;
use topica_test_utils::{MockEmbedder, MockProvider};

/// Axis order of [`embedder`]: neural networks, food, career.
pub const NN_AXIS: [f32; 3] = [1.0, 0.0, 0.0];

pub fn embedder() -> MockEmbedder {
    MockEmbedder::new(&[
        &["neural", "network", "layer", "backprop", "gradient", "neuron"],
        &["waffle", "breakfast", "hungry", "pancake", "diner"],
        &["data scientist", "google", "employer", "career"],
    ])
}

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub embedder: Arc<MockEmbedder>,
    pub storage: Arc<FileStore>,
    pub config: TopicaConfig,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut TopicaConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = TopicaConfig::default();
        config.provider.retry_backoff_ms = 0;
        config.provider.max_attempts = 2;
        config.memory.summary_wait_ms = 5_000;
        config.storage.data_dir = dir.path().display().to_string();
        adjust(&mut config);

        Self {
            provider: Arc::new(MockProvider::new()),
            embedder: Arc::new(embedder()),
            storage: Arc::new(FileStore::new(dir.path())),
            config,
            dir,
        }
    }

    /// A fresh orchestrator over the same provider, embedder, and storage.
    pub fn orchestrator(&self) -> SessionOrchestrator {
        SessionOrchestrator::new(
            &self.config,
            self.provider.clone(),
            self.embedder.clone(),
            self.storage.clone(),
        )
    }

    pub async fn script_facts(&self, facts: serde_json::Value) {
        self.provider
            .push_response("FactsResponse", &serde_json::json!({ "facts": facts }).to_string())
            .await;
    }

    pub async fn script_label(&self, label: &str, summary: &str) {
        self.provider
            .push_response(
                "TopicLabel",
                &serde_json::json!({ "label": label, "summary": summary }).to_string(),
            )
            .await;
    }

    pub async fn script_switch(&self, switch: bool, topic: &str) {
        self.provider
            .push_response(
                "TopicSwitchDecision",
                &serde_json::json!({ "switch": switch, "topic": topic }).to_string(),
            )
            .await;
    }

    /// Prompt of the most recent free-text (response generation) request.
    pub async fn last_response_prompt(&self) -> String {
        self.provider
            .requests()
            .await
            .into_iter()
            .rev()
            .find(|r| r.response_format.is_none())
            .map(|r| r.prompt)
            .unwrap_or_default()
    }
}

/// Four turns about neural networks followed by a move to breakfast.
pub const NN_TURNS: [(&str, &str); 4] = [
    (
        "How do neural networks learn?",
        "A neural network learns by adjusting weights with gradient descent.",
    ),
    (
        "What does each layer in a neural network do?",
        "Each layer transforms its input; deeper layer outputs get more abstract.",
    ),
    (
        "How does backprop compute the gradient?",
        "Backprop applies the chain rule from the output layer back to the first layer.",
    ),
    (
        "Why do deep neural networks need so much data?",
        "Large networks have many neurons and parameters to fit.",
    ),
];

pub const WAFFLE_TURN: (&str, &str) = (
    "Actually I'm hungry, is Waffle House open right now?",
    "Most Waffle House locations are open 24 hours.",
);

pub const NN_SUMMARY: &str =
    "The user asked how neural networks learn, what each layer does, and how backprop computes the gradient.";
