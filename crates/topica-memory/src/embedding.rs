// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin helpers over [`EmbeddingAdapter`] for single texts and batches.

use topica_core::{EmbeddingAdapter, TopicaError};
use topica_core::types::EmbeddingInput;

/// Embed a batch of texts, checking that one vector comes back per input.
pub async fn embed_batch(
    embedder: &dyn EmbeddingAdapter,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, TopicaError> {
    let expected = texts.len();
    let output = embedder.embed(EmbeddingInput { texts }).await?;
    if output.embeddings.len() != expected {
        return Err(TopicaError::Internal(format!(
            "embedding adapter returned {} vectors for {expected} inputs",
            output.embeddings.len()
        )));
    }
    Ok(output.embeddings)
}

/// Embed one text. Blank text yields an empty vector without a provider call.
pub async fn embed_text(embedder: &dyn EmbeddingAdapter, text: &str) -> Result<Vec<f32>, TopicaError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut vectors = embed_batch(embedder, vec![text.to_string()]).await?;
    Ok(vectors.pop().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use topica_test_utils::MockEmbedder;

    #[tokio::test]
    async fn blank_text_skips_the_provider() {
        let embedder = MockEmbedder::new(&[&["rust"]]);
        let v = embed_text(&embedder, "   ").await.unwrap();
        assert!(v.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn batch_returns_one_vector_per_text() {
        let embedder = MockEmbedder::new(&[&["rust"], &["food"]]);
        let vs = embed_batch(&embedder, vec!["rust code".into(), "food".into()])
            .await
            .unwrap();
        assert_eq!(vs.len(), 2);
        assert_eq!(vs[0], vec![1.0, 0.0]);
        assert_eq!(vs[1], vec![0.0, 1.0]);
    }
}
