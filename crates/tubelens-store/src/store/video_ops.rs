//! Video, transcript and comment operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;
use tubelens_types::{CommentRecord, VideoId, VideoInfo};

use crate::error::Result;

use super::{Database, now_rfc3339};

const COMMENT_COLUMNS: &str =
    "id, text, parent_id, like_count, published_at, total_reply_count";

/// Map a row selected with [`COMMENT_COLUMNS`].
fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    let published_at: Option<String> = row.get(4)?;
    Ok(CommentRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        parent_id: row.get(2)?,
        like_count: row.get(3)?,
        published_at: published_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        total_reply_count: row.get(5)?,
    })
}

impl Database {
    // ─────────────────────────────────────────────────────────────────────────
    // Videos
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a video or update its title and thumbnail.
    pub fn upsert_video(&self, id: &VideoId, title: &str, thumbnail_url: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO videos (id, title, thumbnail_url, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                thumbnail_url = excluded.thumbnail_url
            "#,
            params![id.as_str(), title, thumbnail_url, now_rfc3339()],
        )?;
        debug!(video_id = %id, "Upserted video");
        Ok(())
    }

    pub fn video_exists(&self, id: &VideoId) -> Result<bool> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Store the rendered content summary for a video.
    pub fn set_html_summary(&self, id: &VideoId, html: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE videos SET html_summary = ?2 WHERE id = ?1",
            params![id.as_str(), html],
        )?;
        Ok(())
    }

    pub fn html_summary(&self, id: &VideoId) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let html: Option<Option<String>> = conn
            .query_row(
                "SELECT html_summary FROM videos WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(html.flatten())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transcripts
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the original transcript of a video.
    pub fn upsert_transcript(&self, id: &VideoId, original: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO transcripts (video_id, original)
            VALUES (?1, ?2)
            ON CONFLICT(video_id) DO UPDATE SET original = excluded.original
            "#,
            params![id.as_str(), original],
        )?;
        Ok(())
    }

    pub fn transcript(&self, id: &VideoId) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let transcript = conn
            .query_row(
                "SELECT original FROM transcripts WHERE video_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(transcript)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Comments
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert comments for a video, updating like and reply counts of
    /// comments already stored.
    pub fn upsert_comments(&self, video_id: &VideoId, comments: &[CommentRecord]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO comments
                    (id, video_id, text, parent_id, like_count, published_at, total_reply_count)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    like_count = excluded.like_count,
                    total_reply_count = excluded.total_reply_count
                "#,
            )?;
            for comment in comments {
                let parent_id = comment.parent_id.as_deref().filter(|p| !p.is_empty());
                stmt.execute(params![
                    comment.id,
                    video_id.as_str(),
                    comment.text,
                    parent_id,
                    comment.like_count,
                    comment.published_at.map(|t| t.to_rfc3339()),
                    comment.total_reply_count,
                ])?;
            }
        }
        tx.commit()?;

        debug!(video_id = %video_id, count = comments.len(), "Upserted comments");
        Ok(())
    }

    /// All comments of a video in insertion order.
    pub fn comments(&self, video_id: &VideoId) -> Result<Vec<CommentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE video_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![video_id.as_str()], comment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Replies whose `parent_id` is exactly `parent_id`, in insertion order.
    pub fn replies(&self, video_id: &VideoId, parent_id: &str) -> Result<Vec<CommentRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE video_id = ?1 AND parent_id = ?2 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![video_id.as_str(), parent_id], comment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Whole videos
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a fetched video with its transcript and comments.
    pub fn save_video(&self, video: &VideoInfo) -> Result<()> {
        self.upsert_video(&video.video_id, &video.title, &video.thumbnail_url)?;
        self.upsert_transcript(&video.video_id, &video.transcript)?;
        self.upsert_comments(&video.video_id, &video.comments)?;
        Ok(())
    }

    /// Load a previously stored video, or `None` if it was never saved.
    pub fn load_video(&self, id: &VideoId) -> Result<Option<VideoInfo>> {
        let header: Option<(String, Option<String>)> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT title, thumbnail_url FROM videos WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };

        let Some((title, thumbnail_url)) = header else {
            return Ok(None);
        };

        Ok(Some(VideoInfo {
            video_id: id.clone(),
            title,
            thumbnail_url: thumbnail_url.unwrap_or_default(),
            transcript: self.transcript(id)?.unwrap_or_default(),
            comments: self.comments(id)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    fn sample_video() -> VideoInfo {
        VideoInfo {
            video_id: video_id(),
            title: "Never Gonna".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg".to_string(),
            transcript: "We're no strangers to love".to_string(),
            comments: vec![
                CommentRecord::top_level("c1", "classic").with_likes(10),
                CommentRecord::reply("c1.r1", "c1", "agreed"),
                CommentRecord::top_level("c2", "still good"),
                CommentRecord::reply("c1.r2", "c1", "same"),
            ],
        }
    }

    #[test]
    fn test_save_and_load_video() {
        let db = Database::open_in_memory(4).unwrap();
        assert!(db.load_video(&video_id()).unwrap().is_none());

        let video = sample_video();
        db.save_video(&video).unwrap();

        assert!(db.video_exists(&video_id()).unwrap());
        let loaded = db.load_video(&video_id()).unwrap().unwrap();
        assert_eq!(loaded.title, video.title);
        assert_eq!(loaded.transcript, video.transcript);
        assert_eq!(loaded.comments.len(), 4);
        assert_eq!(loaded.comments[0].like_count, 10);
    }

    #[test]
    fn test_replies_in_insertion_order() {
        let db = Database::open_in_memory(4).unwrap();
        db.save_video(&sample_video()).unwrap();

        let replies = db.replies(&video_id(), "c1").unwrap();
        let ids: Vec<_> = replies.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1.r1", "c1.r2"]);
        assert!(db.replies(&video_id(), "c2").unwrap().is_empty());
    }

    #[test]
    fn test_upserts_are_idempotent() {
        let db = Database::open_in_memory(4).unwrap();
        let mut video = sample_video();
        db.save_video(&video).unwrap();

        video.title = "Renamed".to_string();
        video.comments[0].like_count = 99;
        db.save_video(&video).unwrap();

        let loaded = db.load_video(&video_id()).unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert_eq!(loaded.comments.len(), 4);
        assert_eq!(loaded.comments[0].like_count, 99);
    }

    #[test]
    fn test_html_summary() {
        let db = Database::open_in_memory(4).unwrap();
        db.save_video(&sample_video()).unwrap();
        assert!(db.html_summary(&video_id()).unwrap().is_none());

        db.set_html_summary(&video_id(), "<h1>hi</h1>").unwrap();
        assert_eq!(
            db.html_summary(&video_id()).unwrap().as_deref(),
            Some("<h1>hi</h1>")
        );
    }

    #[test]
    fn test_empty_parent_stored_as_top_level() {
        let db = Database::open_in_memory(4).unwrap();
        let mut video = sample_video();
        video.comments = vec![CommentRecord {
            parent_id: Some(String::new()),
            ..CommentRecord::top_level("c9", "blank parent")
        }];
        db.save_video(&video).unwrap();

        let loaded = db.comments(&video_id()).unwrap();
        assert!(loaded[0].parent_id.is_none());
        assert!(loaded[0].is_top_level());
    }
}
