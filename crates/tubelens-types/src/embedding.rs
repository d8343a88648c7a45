//! Embedding vectors for transcript topics, questions and comment threads.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Dimensionality of every stored embedding.
pub const EMBEDDING_DIMS: usize = 768;

/// Length of generated topic/question identifiers.
pub const SHORT_ID_LEN: usize = 11;

/// A vector representation of a topic, question or comment thread.
///
/// `parent_id == None` marks a top-level topic (or comment thread);
/// `Some(topic_id)` marks a question derived from that topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub text: String,
    pub vector: Vec<f32>,
}

impl EmbeddingVector {
    /// Create a top-level vector.
    pub fn topic(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            text: text.into(),
            vector,
        }
    }

    /// Create a child vector under `parent_id`.
    pub fn question(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        text: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Self::topic(id, text, vector)
        }
    }

    pub fn is_topic(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Generate a random alphanumeric identifier of [`SHORT_ID_LEN`] characters.
pub fn new_short_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}
