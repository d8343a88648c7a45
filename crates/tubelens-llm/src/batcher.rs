//! Chunked, paced embedding of large text lists.
//!
//! Providers cap how many texts a single request may carry and how often
//! requests may be made. [`EmbeddingBatcher`] splits its input into
//! fixed-size chunks, sends them one after another with a fixed delay
//! between requests, and concatenates the results in input order.

use std::time::Duration;

use tracing::{debug, info};

use crate::embeddings::SharedEmbedder;
use crate::error::{LlmError, Result};

/// Default number of texts per provider request.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default delay between successive provider requests.
pub const DEFAULT_PACING: Duration = Duration::from_secs(5);

/// Embeds arbitrarily many texts through a rate-limited [`Embedder`](crate::Embedder).
#[derive(Clone)]
pub struct EmbeddingBatcher {
    embedder: SharedEmbedder,
    chunk_size: usize,
    pacing: Duration,
}

impl EmbeddingBatcher {
    pub fn new(embedder: SharedEmbedder) -> Self {
        Self {
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub fn embedder(&self) -> &SharedEmbedder {
        &self.embedder
    }

    /// Embed `texts`, returning one vector per text in the same order.
    ///
    /// Any failing chunk fails the whole call; no partial result is returned.
    pub async fn embed<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.chunk_size == 0 {
            return Err(LlmError::InvalidRequest(
                "Embedding chunk size must be positive".to_string(),
            ));
        }

        let chunks = texts.len().div_ceil(self.chunk_size);
        info!(
            embedder = self.embedder.name(),
            texts = texts.len(),
            chunks,
            chunk_size = self.chunk_size,
            "Embedding texts"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for (index, chunk) in texts.chunks(self.chunk_size).enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let batch: Vec<&str> = chunk.iter().map(AsRef::as_ref).collect();
            let embedded = self.embedder.embed_batch(&batch).await?;
            if embedded.len() != batch.len() {
                return Err(LlmError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    got: embedded.len(),
                });
            }

            debug!(chunk = index, size = batch.len(), "Embedded chunk");
            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_across_chunks() {
        let mock = Arc::new(MockEmbedder::new(8));
        let batcher = EmbeddingBatcher::new(mock.clone()).with_chunk_size(3);

        let input = texts(7);
        let vectors = batcher.embed(&input).await.unwrap();

        assert_eq!(vectors.len(), 7);
        for (text, vector) in input.iter().zip(&vectors) {
            assert_eq!(vector, &mock.vector_for(text));
        }
        assert_eq!(mock.calls(), vec![3, 3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_independent_of_chunk_size() {
        let input = texts(10);
        let mut results = Vec::new();
        for chunk_size in [1, 4, 10, 100] {
            let batcher =
                EmbeddingBatcher::new(Arc::new(MockEmbedder::new(8))).with_chunk_size(chunk_size);
            results.push(batcher.embed(&input).await.unwrap());
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_chunks_only() {
        let batcher = EmbeddingBatcher::new(Arc::new(MockEmbedder::new(4))).with_chunk_size(100);

        let start = Instant::now();
        batcher.embed(&texts(100)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        let start = Instant::now();
        batcher.embed(&texts(250)).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_PACING * 2);
        assert!(elapsed < DEFAULT_PACING * 3);
    }

    #[tokio::test]
    async fn test_empty_input_skips_provider() {
        let mock = Arc::new(MockEmbedder::new(4));
        let batcher = EmbeddingBatcher::new(mock.clone());
        let vectors = batcher.embed::<String>(&[]).await.unwrap();
        assert!(vectors.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_failure_aborts_batch() {
        let mock = Arc::new(MockEmbedder::new(4).failing_on_call(1));
        let batcher = EmbeddingBatcher::new(mock.clone()).with_chunk_size(2);

        let err = batcher.embed(&texts(6)).await.unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
        // The third chunk is never sent.
        assert_eq!(mock.calls(), vec![2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_response_is_count_mismatch() {
        let mock = Arc::new(MockEmbedder::new(4).short_on_call(0));
        let batcher = EmbeddingBatcher::new(mock).with_chunk_size(5);

        let err = batcher.embed(&texts(5)).await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::EmbeddingCountMismatch {
                expected: 5,
                got: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let batcher = EmbeddingBatcher::new(Arc::new(MockEmbedder::new(4))).with_chunk_size(0);
        assert!(matches!(
            batcher.embed(&texts(1)).await,
            Err(LlmError::InvalidRequest(_))
        ));
    }
}
