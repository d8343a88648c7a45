//! Video, transcript and comment records.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Timestamp;

/// Length of a YouTube video identifier.
const VIDEO_ID_LEN: usize = 11;

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:youtu\.be/|youtube\.com/(?:shorts/|embed/|v/|watch\?v=|ytscreeningroom\?v=)|youtube\.com/.*?[?&]v=)([^"&?/\s]{11})"#,
    )
    .expect("video url pattern is valid")
});

/// Error returned when a video identifier cannot be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to extract a video id from '{input}'")]
pub struct VideoIdError {
    /// The rejected input.
    pub input: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// VideoId
// ─────────────────────────────────────────────────────────────────────────────

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Extract a video id from a watch/short/embed URL or a bare id.
    pub fn parse(input: &str) -> Result<Self, VideoIdError> {
        let trimmed = input.trim();

        if trimmed.len() == VIDEO_ID_LEN && trimmed.chars().all(is_id_char) {
            return Ok(Self(trimmed.to_string()));
        }

        VIDEO_URL_RE
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| VideoIdError {
                input: input.to_string(),
            })
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = VideoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingested records
// ─────────────────────────────────────────────────────────────────────────────

/// A single comment or reply, normalized from the provider's thread format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub text: String,
    /// Set for replies; `None` for top-level comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    /// Only top-level comments carry a reply count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_reply_count: Option<i64>,
}

impl CommentRecord {
    /// Create a top-level comment.
    pub fn top_level(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            parent_id: None,
            like_count: 0,
            published_at: None,
            total_reply_count: None,
        }
    }

    /// Create a reply to `parent_id`.
    pub fn reply(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            ..Self::top_level(id, text)
        }
    }

    /// Set the like count.
    pub fn with_likes(mut self, like_count: i64) -> Self {
        self.like_count = like_count;
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.as_deref().is_none_or(str::is_empty)
    }
}

/// Everything ingested for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: VideoId,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    pub transcript: String,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

impl VideoInfo {
    /// Top-level comments in ingestion order.
    pub fn top_level_comments(&self) -> impl Iterator<Item = &CommentRecord> {
        self.comments.iter().filter(|c| c.is_top_level())
    }
}

/// A top-level comment with the text of its replies.
///
/// This is the document embedded for each comment thread; it serializes to
/// `{mainComment, replies}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    #[serde(skip)]
    pub comment_id: String,
    pub main_comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_id() {
        let id = VideoId::parse("Lfr2KvIS2nY").unwrap();
        assert_eq!(id.as_str(), "Lfr2KvIS2nY");
    }

    #[test]
    fn test_parse_url_variants() {
        let cases = [
            "https://www.youtube.com/watch?v=Lfr2KvIS2nY",
            "https://youtu.be/Lfr2KvIS2nY",
            "https://www.youtube.com/shorts/Lfr2KvIS2nY",
            "https://www.youtube.com/embed/Lfr2KvIS2nY?start=10",
            "https://www.youtube.com/watch?feature=share&v=Lfr2KvIS2nY",
            "  https://youtube.com/watch?v=Lfr2KvIS2nY&t=42s  ",
        ];
        for case in cases {
            let id = VideoId::parse(case).unwrap_or_else(|e| panic!("{case}: {e}"));
            assert_eq!(id.as_str(), "Lfr2KvIS2nY", "input: {case}");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(VideoId::parse("not a video").is_err());
        assert!(VideoId::parse("https://example.com/watch?v=short").is_err());
        assert!(VideoId::parse("").is_err());
    }

    #[test]
    fn test_watch_url() {
        let id: VideoId = "Lfr2KvIS2nY".parse().unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=Lfr2KvIS2nY");
    }

    #[test]
    fn test_top_level_detection() {
        let top = CommentRecord::top_level("c1", "hello");
        let reply = CommentRecord::reply("c2", "c1", "hi");
        let mut blank_parent = CommentRecord::top_level("c3", "x");
        blank_parent.parent_id = Some(String::new());

        assert!(top.is_top_level());
        assert!(!reply.is_top_level());
        assert!(blank_parent.is_top_level());
    }

    #[test]
    fn test_video_info_camel_case() {
        let json = r#"{
            "videoId": "Lfr2KvIS2nY",
            "title": "A talk",
            "thumbnailUrl": "https://img/x.jpg",
            "transcript": "words",
            "comments": [
                {"id": "c1", "text": "great", "likeCount": 3, "totalReplyCount": 1},
                {"id": "c2", "text": "agreed", "parentId": "c1"}
            ]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.comments.len(), 2);
        assert_eq!(info.comments[0].like_count, 3);
        assert_eq!(info.top_level_comments().count(), 1);
    }
}
