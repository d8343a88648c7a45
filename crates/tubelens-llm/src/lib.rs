//! LLM and embedding clients for tubelens.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────┐   ┌───────────────────────────────┐
//! │  LlmBackend                   │   │  Embedder                     │
//! │  - complete(prompt) -> String │   │  - embed_batch(&[&str])       │
//! └───────────────────────────────┘   └───────────────────────────────┘
//!          │                                  │
//!     ┌────┴─────┐                    ┌───────┴──────┐
//!     ▼          ▼                    ▼              ▼
//! ┌────────┐ ┌──────┐          ┌──────────────┐  ┌──────┐
//! │ Gemini │ │ Mock │          │GeminiEmbedder│  │ Mock │
//! └────────┘ └──────┘          └──────────────┘  └──────┘
//!                                     ▲
//!                             EmbeddingBatcher
//!                        (fixed chunks, fixed pacing)
//! ```
//!
//! Mock implementations are available under the `testing` feature.

pub mod backend;
pub mod batcher;
pub mod embeddings;
pub mod error;
pub mod fence;
pub mod gemini;

pub use backend::{LlmBackend, SharedBackend};
pub use batcher::{DEFAULT_CHUNK_SIZE, DEFAULT_PACING, EmbeddingBatcher};
pub use embeddings::{
    DEFAULT_EMBEDDING_DIMS, DEFAULT_EMBEDDING_MODEL, Embedder, GeminiEmbedder, SharedEmbedder,
};
pub use error::{LlmError, RateLimitInfo, Result};
pub use fence::extract_fenced_block;
pub use gemini::{DEFAULT_GEMINI_BASE, DEFAULT_GEMINI_MODEL, GeminiBackend, GeminiConfig};

#[cfg(any(test, feature = "testing"))]
pub use backend::{MockBackend, MockResponse};
#[cfg(any(test, feature = "testing"))]
pub use embeddings::MockEmbedder;
