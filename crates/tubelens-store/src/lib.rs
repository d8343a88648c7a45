//! Embedded store for tubelens.
//!
//! A single SQLite file holds fetched videos, their comments, the topic and
//! comment embeddings, and the rankings produced by matching. sqlite-vec
//! supplies the distance functions used for nearest-neighbour queries.
//!
//! ```text
//! videos ──< comments ──< comment_embeddings
//!    │                           ▲
//!    └──< transcript_embeddings  │ vec_distance_*(embedding, ?)
//!              │                 │
//!              └── SimilarityMatcher ──> topic_matches
//! ```

pub mod error;
pub mod similarity;
pub mod store;
pub mod vector;

pub use error::{Result, StoreError};
pub use similarity::{DEFAULT_TOP_K, SimilarityMatcher};
pub use store::{Database, StoredMatch};
pub use vector::{DistanceMetric, init_vector_extension};
