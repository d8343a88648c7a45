//! Transcript and comment embedding storage.

use rusqlite::params;
use tracing::debug;
use tubelens_types::{EmbeddingVector, VideoId};

use crate::error::Result;
use crate::vector::{decode, encode};

use super::{Database, now_rfc3339};

impl Database {
    // ─────────────────────────────────────────────────────────────────────────
    // Transcript embeddings
    // ─────────────────────────────────────────────────────────────────────────

    /// Store topic and question vectors for a video.
    ///
    /// Every vector is checked against the store's dimensionality before
    /// anything is written; an existing id is overwritten.
    pub fn insert_transcript_embeddings(
        &self,
        video_id: &VideoId,
        vectors: &[EmbeddingVector],
    ) -> Result<()> {
        for vector in vectors {
            self.check_dimensions(&vector.vector)?;
        }

        let created_at = now_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transcript_embeddings
                    (id, video_id, parent_id, text, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    text = excluded.text,
                    embedding = excluded.embedding
                "#,
            )?;
            for vector in vectors {
                stmt.execute(params![
                    vector.id,
                    video_id.as_str(),
                    vector.parent_id,
                    vector.text,
                    encode(&vector.vector),
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        debug!(video_id = %video_id, count = vectors.len(), "Stored transcript embeddings");
        Ok(())
    }

    /// Topic and question vectors of a video in insertion order.
    pub fn transcript_embeddings(&self, video_id: &VideoId) -> Result<Vec<EmbeddingVector>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, parent_id, text, embedding
            FROM transcript_embeddings
            WHERE video_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map(params![video_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut vectors = Vec::new();
        for row in rows {
            let (id, parent_id, text, blob) = row?;
            vectors.push(EmbeddingVector {
                id,
                parent_id,
                text,
                vector: decode(&blob)?,
            });
        }
        Ok(vectors)
    }

    pub fn transcript_embedding_count(&self, video_id: &VideoId) -> Result<usize> {
        self.count_rows("transcript_embeddings", video_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Comment embeddings
    // ─────────────────────────────────────────────────────────────────────────

    /// Store comment thread vectors; `id` of each vector is the comment id.
    pub fn insert_comment_embeddings(
        &self,
        video_id: &VideoId,
        vectors: &[EmbeddingVector],
    ) -> Result<()> {
        for vector in vectors {
            self.check_dimensions(&vector.vector)?;
        }

        let created_at = now_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO comment_embeddings
                    (comment_id, video_id, text, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(comment_id) DO UPDATE SET
                    text = excluded.text,
                    embedding = excluded.embedding
                "#,
            )?;
            for vector in vectors {
                stmt.execute(params![
                    vector.id,
                    video_id.as_str(),
                    vector.text,
                    encode(&vector.vector),
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        debug!(video_id = %video_id, count = vectors.len(), "Stored comment embeddings");
        Ok(())
    }

    pub fn comment_embedding_count(&self, video_id: &VideoId) -> Result<usize> {
        self.count_rows("comment_embeddings", video_id)
    }

    fn count_rows(&self, table: &'static str, video_id: &VideoId) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE video_id = ?1"),
            params![video_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
