// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Topica.
//!
//! Deterministic stand-ins for the LLM and embedding services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted LLM replies keyed by response schema name
//! - [`MockEmbedder`] - Keyword-axis embeddings with per-text overrides

pub mod mock_embedder;
pub mod mock_provider;

pub use mock_embedder::MockEmbedder;
pub use mock_provider::{MockProvider, MockReply, TEXT_KEY};
