//! Video ingestion sources.
//!
//! A [`VideoSource`] turns a video id into a [`VideoInfo`]: title,
//! thumbnail, transcript and every comment with its replies.

mod fixture;
mod youtube;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tubelens_types::{VideoId, VideoInfo};

pub use fixture::FixtureSource;
pub use youtube::{
    DEFAULT_SUPADATA_BASE, DEFAULT_YOUTUBE_BASE, YoutubeSource, YoutubeSourceConfig,
};

/// Errors raised while fetching a video.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("video '{0}' not found")]
    NotFound(String),

    #[error("failed to read fixture '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fixture is for video '{found}', not '{requested}'")]
    Mismatch { requested: String, found: String },
}

/// Provides video metadata, transcript and comments.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoInfo, SourceError>;

    fn name(&self) -> &str;
}

pub type SharedSource = Arc<dyn VideoSource>;
