//! Embeddings support for topic and comment matching.
//!
//! This module provides the [`Embedder`] trait and implementations for
//! generating vector embeddings from text.
//!
//! # Implementations
//!
//! - [`MockEmbedder`]: Returns deterministic embeddings for testing
//! - [`GeminiEmbedder`]: Uses Gemini's `batchEmbedContents` API

use async_trait::async_trait;
use reqwest::{Client, header};
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::gemini::{GeminiConfig, RequestContent, parse_response};

/// Default Gemini embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Dimensionality of `text-embedding-004`.
pub const DEFAULT_EMBEDDING_DIMS: usize = 768;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
///
/// A single call embeds one provider request's worth of texts; pacing and
/// chunking over large inputs is the job of
/// [`EmbeddingBatcher`](crate::EmbeddingBatcher).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for `texts`, one per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::EmbeddingCountMismatch {
                expected: 1,
                got: 0,
            })
    }

    /// Get the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Get the name of this embedder.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across tasks.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "testing"))]
pub use mock::MockEmbedder;

#[cfg(any(test, feature = "testing"))]
mod mock {
    use super::*;
    use parking_lot::Mutex;

    /// A mock embedder for testing purposes.
    ///
    /// Generates deterministic unit-length embeddings from a text hash, so
    /// identical texts always map to identical vectors. Every call is logged
    /// and calls can be scripted to fail or return short.
    #[derive(Debug, Default)]
    pub struct MockEmbedder {
        dimensions: usize,
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
        drop_last_on_call: Option<usize>,
    }

    impl MockEmbedder {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                ..Default::default()
            }
        }

        /// Mock embedder producing 768-dimension vectors.
        pub fn default_dimensions() -> Self {
            Self::new(DEFAULT_EMBEDDING_DIMS)
        }

        /// Fail the `n`th call (zero-based).
        pub fn failing_on_call(mut self, n: usize) -> Self {
            self.fail_on_call = Some(n);
            self
        }

        /// Return one embedding too few on the `n`th call (zero-based).
        pub fn short_on_call(mut self, n: usize) -> Self {
            self.drop_last_on_call = Some(n);
            self
        }

        /// Batch sizes of every call made so far.
        pub fn calls(&self) -> Vec<usize> {
            self.calls.lock().clone()
        }

        /// The vector this embedder returns for `text`.
        pub fn vector_for(&self, text: &str) -> Vec<f32> {
            hashed_unit_vector(text, self.dimensions)
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            let call = {
                let mut calls = self.calls.lock();
                calls.push(texts.len());
                calls.len() - 1
            };

            if self.fail_on_call == Some(call) {
                return Err(LlmError::Backend(format!("MockEmbedder: call {call} failed")));
            }

            let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
            if self.drop_last_on_call == Some(call) {
                vectors.pop();
            }
            Ok(vectors)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn hashed_unit_vector(text: &str, dimensions: usize) -> Vec<f32> {
        let mut state = simple_hash(text);
        let mut embedding: Vec<f32> = (0..dimensions)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as u16 as f32 / 32768.0) - 1.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }

    fn simple_hash(s: &str) -> u64 {
        let mut hash: u64 = 5381;
        for byte in s.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        hash
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini `batchEmbedContents` client.
pub struct GeminiEmbedder {
    client: Client,
    config: GeminiConfig,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Create an embedder for the model named in `config`
    /// (normally [`DEFAULT_EMBEDDING_MODEL`]).
    pub fn new(config: GeminiConfig, dimensions: usize) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("Gemini API key is empty".to_string()));
        }
        let client = config.http_client()?;
        Ok(Self {
            client,
            config,
            dimensions,
        })
    }

    pub fn from_env() -> Result<Self> {
        let config = GeminiConfig::from_env()?.with_model(DEFAULT_EMBEDDING_MODEL);
        Self::new(config, DEFAULT_EMBEDDING_DIMS)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = format!("models/{}", self.config.model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: model.clone(),
                    content: RequestContent::text(text),
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.config.model_url("batchEmbedContents"))
            .header("x-goog-api-key", &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let result: BatchEmbedResponse = parse_response(response).await?;
        let vectors: Vec<Vec<f32>> = result.embeddings.into_iter().map(|e| e.values).collect();

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(LlmError::Backend(format!(
                "Embedding has {} dimensions, expected {}",
                bad.len(),
                self.dimensions
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, serde::Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, serde::Serialize)]
struct EmbedContentRequest {
    model: String,
    content: RequestContent,
}

#[derive(Debug, serde::Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, serde::Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::default_dimensions();
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(embedder.name(), "mock");

        let embedding = embedder.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 768);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(16);
        let e1 = embedder.embed("test text").await.unwrap();
        let e2 = embedder.embed("test text").await.unwrap();
        assert_eq!(e1, e2);
        assert_ne!(e1, embedder.embed("other text").await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_embedder_scripted_failures() {
        let embedder = MockEmbedder::new(4).failing_on_call(1).short_on_call(2);
        assert_eq!(embedder.embed_batch(&["a", "b"]).await.unwrap().len(), 2);
        assert!(embedder.embed_batch(&["a", "b"]).await.is_err());
        assert_eq!(embedder.embed_batch(&["a", "b"]).await.unwrap().len(), 1);
        assert_eq!(embedder.calls(), vec![2, 2, 2]);
    }

    #[test]
    fn test_batch_request_shape() {
        let request = BatchEmbedRequest {
            requests: vec![EmbedContentRequest {
                model: "models/text-embedding-004".into(),
                content: RequestContent::text("hi"),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["model"], "models/text-embedding-004");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_batch_response_parse() {
        let body = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#;
        let parsed: BatchEmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GeminiEmbedder::new(GeminiConfig::new(""), 768),
            Err(LlmError::Config(_))
        ));
    }
}
