//! Nearest-neighbour comment queries and stored topic rankings.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tubelens_types::{RankedComment, SimilarityMatch, VideoId};

use crate::error::Result;
use crate::vector::{DistanceMetric, encode};

use super::{Database, now_rfc3339};

/// One persisted row of a topic's comment ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub topic_id: String,
    pub rank: usize,
    pub comment_id: String,
    pub distance: f32,
}

impl Database {
    /// The `k` comment embeddings of a video closest to `query`.
    ///
    /// Results are ascending by distance with ties broken by insertion
    /// order. Replies are not attached here.
    pub fn nearest_comments(
        &self,
        video_id: &VideoId,
        query: &[f32],
        k: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<RankedComment>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(query)?;

        let sql = format!(
            r#"
            SELECT
                ce.comment_id,
                COALESCE(c.text, ce.text),
                c.parent_id,
                COALESCE(c.like_count, 0),
                {func}(ce.embedding, ?2) AS distance
            FROM comment_embeddings ce
            LEFT JOIN comments c ON c.id = ce.comment_id
            WHERE ce.video_id = ?1
            ORDER BY distance, ce.rowid
            LIMIT ?3
            "#,
            func = metric.sql_function()
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![video_id.as_str(), encode(query), k as i64],
            |row| {
                Ok(RankedComment {
                    comment_id: row.get(0)?,
                    text: row.get(1)?,
                    parent_id: row.get(2)?,
                    like_count: row.get(3)?,
                    distance: row.get::<_, f64>(4)? as f32,
                    replies: Vec::new(),
                })
            },
        )?;
        let ranked = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(video_id = %video_id, k, found = ranked.len(), %metric, "Nearest comments");
        Ok(ranked)
    }

    /// Replace the stored ranking for the topic in `matched`.
    pub fn save_topic_matches(&self, video_id: &VideoId, matched: &SimilarityMatch) -> Result<()> {
        let created_at = now_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM topic_matches WHERE topic_id = ?1",
            params![matched.topic_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO topic_matches
                    (topic_id, video_id, rank, comment_id, distance, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (rank, comment) in matched.ranked.iter().enumerate() {
                stmt.execute(params![
                    matched.topic_id,
                    video_id.as_str(),
                    rank as i64,
                    comment.comment_id,
                    comment.distance as f64,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored rankings of a video, grouped by topic in write order.
    pub fn topic_matches(&self, video_id: &VideoId) -> Result<Vec<StoredMatch>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT topic_id, rank, comment_id, distance
            FROM topic_matches
            WHERE video_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map(params![video_id.as_str()], |row| {
            Ok(StoredMatch {
                topic_id: row.get(0)?,
                rank: row.get::<_, i64>(1)? as usize,
                comment_id: row.get(2)?,
                distance: row.get::<_, f64>(3)? as f32,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
