//! Topic to comment similarity results.

use serde::{Deserialize, Serialize};

use crate::video::CommentRecord;

/// A comment ranked against a topic vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedComment {
    pub comment_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub like_count: i64,
    /// Distance to the topic vector (lower is closer).
    pub distance: f32,
    /// Replies attached by exact `parent_id` lookup.
    #[serde(default)]
    pub replies: Vec<CommentRecord>,
}

/// The nearest comments for one topic or question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub topic_id: String,
    pub topic_text: String,
    /// Parent topic id when the matched vector is a question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub k: usize,
    /// Ascending by distance, at most `k` entries.
    pub ranked: Vec<RankedComment>,
}

impl SimilarityMatch {
    /// Ranked comment ids, nearest first.
    pub fn comment_ids(&self) -> Vec<&str> {
        self.ranked.iter().map(|r| r.comment_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
