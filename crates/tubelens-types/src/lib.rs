//! Shared types for the tubelens pipeline.
//!
//! Records in this crate travel between the ingestion sources, the
//! embedded store, and the pipeline nodes. All of them serialize to JSON so
//! they can be placed into pipeline memory and result slots.

pub mod embedding;
pub mod matching;
pub mod topic;
pub mod video;

pub use embedding::{EMBEDDING_DIMS, EmbeddingVector, SHORT_ID_LEN, new_short_id};
pub use matching::{RankedComment, SimilarityMatch};
pub use topic::{ProcessedQuestion, ProcessedTopic, TopicOutline};
pub use video::{CommentRecord, CommentThread, VideoId, VideoIdError, VideoInfo};

/// Timestamp type used across records.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
