//! Offline source backed by a JSON `VideoInfo` document.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;
use tubelens_types::{VideoId, VideoInfo};

use super::{SourceError, VideoSource};

/// Serves one pre-recorded video.
#[derive(Debug)]
pub struct FixtureSource {
    video: VideoInfo,
    fetches: AtomicUsize,
}

impl FixtureSource {
    pub fn new(video: VideoInfo) -> Self {
        Self {
            video,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Load the fixture from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let video: VideoInfo = serde_json::from_str(&text)?;
        debug!(path = %path.display(), video_id = %video.video_id, "Loaded fixture");
        Ok(Self::new(video))
    }

    pub fn video(&self) -> &VideoInfo {
        &self.video
    }

    /// Number of successful fetches.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSource for FixtureSource {
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoInfo, SourceError> {
        if &self.video.video_id != video_id {
            return Err(SourceError::Mismatch {
                requested: video_id.to_string(),
                found: self.video.video_id.to_string(),
            });
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.video.clone())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelens_types::CommentRecord;

    fn video() -> VideoInfo {
        VideoInfo {
            video_id: VideoId::parse("Lfr2KvIS2nY").unwrap(),
            title: "Talk".to_string(),
            thumbnail_url: String::new(),
            transcript: "hello".to_string(),
            comments: vec![CommentRecord::top_level("c1", "nice")],
        }
    }

    #[tokio::test]
    async fn test_fetch_matching_id() {
        let source = FixtureSource::new(video());
        let fetched = source.fetch(&video().video_id).await.unwrap();
        assert_eq!(fetched, video());
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_other_id_fails() {
        let source = FixtureSource::new(video());
        let other = VideoId::parse("aaaaaaaaaaa").unwrap();
        let err = source.fetch(&other).await.unwrap_err();
        assert!(matches!(err, SourceError::Mismatch { .. }));
        assert_eq!(source.fetch_count(), 0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.json");
        std::fs::write(&path, serde_json::to_string(&video()).unwrap()).unwrap();

        let source = FixtureSource::from_file(&path).unwrap();
        assert_eq!(source.video().title, "Talk");

        let missing = FixtureSource::from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, SourceError::Io { .. }));
    }
}
