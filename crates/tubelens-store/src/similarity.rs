//! Topic to comment matching over stored comment embeddings.

use std::sync::Arc;

use tracing::debug;
use tubelens_types::{EmbeddingVector, SimilarityMatch, VideoId};

use crate::error::Result;
use crate::store::Database;
use crate::vector::DistanceMetric;

/// Default number of comments ranked per topic.
pub const DEFAULT_TOP_K: usize = 3;

/// Ranks a video's comment threads against topic and question vectors.
#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    store: Arc<Database>,
    k: usize,
    metric: DistanceMetric,
}

impl SimilarityMatcher {
    pub fn new(store: Arc<Database>, k: usize) -> Self {
        Self {
            store,
            k,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Find the `k` nearest comments for `topic` and attach their replies.
    ///
    /// A video without comment embeddings yields an empty ranking.
    pub fn find_matches(
        &self,
        video_id: &VideoId,
        topic: &EmbeddingVector,
    ) -> Result<SimilarityMatch> {
        let mut ranked = self
            .store
            .nearest_comments(video_id, &topic.vector, self.k, self.metric)?;

        for comment in &mut ranked {
            if comment.parent_id.is_none() {
                comment.replies = self.store.replies(video_id, &comment.comment_id)?;
            }
        }

        debug!(
            video_id = %video_id,
            topic_id = %topic.id,
            ranked = ranked.len(),
            "Matched topic to comments"
        );

        Ok(SimilarityMatch {
            topic_id: topic.id.clone(),
            topic_text: topic.text.clone(),
            parent_id: topic.parent_id.clone(),
            k: self.k,
            ranked,
        })
    }

    /// Store `matched` as the current ranking for its topic.
    pub fn persist(&self, video_id: &VideoId, matched: &SimilarityMatch) -> Result<()> {
        self.store.save_topic_matches(video_id, matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelens_types::{CommentRecord, VideoInfo};

    fn video_id() -> VideoId {
        VideoId::parse("abcdefghijk").unwrap()
    }

    fn store_with(comments: Vec<CommentRecord>, vectors: Vec<EmbeddingVector>) -> Arc<Database> {
        let db = Database::open_in_memory(2).unwrap();
        db.save_video(&VideoInfo {
            video_id: video_id(),
            title: "t".into(),
            thumbnail_url: String::new(),
            transcript: String::new(),
            comments,
        })
        .unwrap();
        db.insert_comment_embeddings(&video_id(), &vectors).unwrap();
        Arc::new(db)
    }

    #[test]
    fn test_ranks_and_attaches_replies() {
        let store = store_with(
            vec![
                CommentRecord::top_level("a", "about rust"),
                CommentRecord::reply("a.1", "a", "first reply"),
                CommentRecord::top_level("b", "about go"),
                CommentRecord::reply("a.2", "a", "second reply"),
            ],
            vec![
                EmbeddingVector::topic("a", "a", vec![1.0, 0.0]),
                EmbeddingVector::topic("b", "b", vec![0.0, 1.0]),
            ],
        );
        let matcher = SimilarityMatcher::new(store, 5);
        let topic = EmbeddingVector::question("q1", "t1", "Rust?", vec![0.9, 0.1]);

        let matched = matcher.find_matches(&video_id(), &topic).unwrap();
        assert_eq!(matched.topic_id, "q1");
        assert_eq!(matched.parent_id.as_deref(), Some("t1"));
        assert_eq!(matched.k, 5);
        assert_eq!(matched.comment_ids(), vec!["a", "b"]);

        let replies: Vec<_> = matched.ranked[0]
            .replies
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(replies, vec!["a.1", "a.2"]);
        assert!(matched.ranked[1].replies.is_empty());
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let store = store_with(
            vec![
                CommentRecord::top_level("x", "x"),
                CommentRecord::top_level("y", "y"),
                CommentRecord::top_level("z", "z"),
            ],
            vec![
                EmbeddingVector::topic("y", "y", vec![1.0, 0.0]),
                EmbeddingVector::topic("x", "x", vec![1.0, 0.0]),
                EmbeddingVector::topic("z", "z", vec![2.0, 0.0]),
            ],
        );
        let matcher = SimilarityMatcher::new(store, 3);
        let topic = EmbeddingVector::topic("t", "t", vec![1.0, 0.0]);

        let first = matcher.find_matches(&video_id(), &topic).unwrap();
        assert_eq!(first.comment_ids(), vec!["y", "x", "z"]);

        let second = matcher.find_matches(&video_id(), &topic).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_comment_vectors_is_empty() {
        let store = store_with(vec![], vec![]);
        let matcher = SimilarityMatcher::new(store, 5);
        let matched = matcher
            .find_matches(&video_id(), &EmbeddingVector::topic("t", "t", vec![1.0, 0.0]))
            .unwrap();
        assert!(matched.is_empty());
    }

    #[test]
    fn test_k_zero_and_k_bound() {
        let store = store_with(
            vec![
                CommentRecord::top_level("a", "a"),
                CommentRecord::top_level("b", "b"),
            ],
            vec![
                EmbeddingVector::topic("a", "a", vec![1.0, 0.0]),
                EmbeddingVector::topic("b", "b", vec![0.0, 1.0]),
            ],
        );
        let topic = EmbeddingVector::topic("t", "t", vec![1.0, 0.0]);

        let none = SimilarityMatcher::new(store.clone(), 0)
            .find_matches(&video_id(), &topic)
            .unwrap();
        assert!(none.is_empty());

        let one = SimilarityMatcher::new(store, 1)
            .with_metric(DistanceMetric::L2)
            .find_matches(&video_id(), &topic)
            .unwrap();
        assert_eq!(one.comment_ids(), vec!["a"]);
    }

    #[test]
    fn test_persist() {
        let store = store_with(
            vec![CommentRecord::top_level("a", "a")],
            vec![EmbeddingVector::topic("a", "a", vec![1.0, 0.0])],
        );
        let matcher = SimilarityMatcher::new(store.clone(), 2);
        let matched = matcher
            .find_matches(&video_id(), &EmbeddingVector::topic("t", "t", vec![1.0, 0.0]))
            .unwrap();
        matcher.persist(&video_id(), &matched).unwrap();

        let stored = store.topic_matches(&video_id()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].topic_id, "t");
    }
}
