//! Loads the video from the store, or fetches and stores it.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;
use tubelens_flow::{Action, Memory, Node};
use tubelens_types::{VideoId, VideoInfo};

use super::{Resources, VIDEO_ID_KEY, VIDEO_KEY};

pub struct IngestPrep {
    video_id: VideoId,
    resources: Arc<Resources>,
}

/// Publishes the [`VideoInfo`] for `video_id` under `video`.
///
/// A video already in the store is served from there; otherwise the
/// source is queried and the result persisted before publishing.
pub struct IngestVideo;

#[async_trait]
impl Node<Resources> for IngestVideo {
    type Prep = IngestPrep;
    type Exec = VideoInfo;

    fn name(&self) -> &str {
        "ingest_video"
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<IngestPrep> {
        Ok(IngestPrep {
            video_id: memory.require(VIDEO_ID_KEY)?,
            resources: memory.shared_resources(),
        })
    }

    async fn execute(&self, prep: &IngestPrep) -> anyhow::Result<VideoInfo> {
        let store = &prep.resources.store;

        if let Some(video) = store.load_video(&prep.video_id)? {
            info!(
                video_id = %prep.video_id,
                comments = video.comments.len(),
                "Loaded video from store"
            );
            return Ok(video);
        }

        let source = &prep.resources.source;
        let video = source
            .fetch(&prep.video_id)
            .await
            .with_context(|| format!("{} could not fetch video {}", source.name(), prep.video_id))?;
        store.save_video(&video)?;

        info!(
            video_id = %prep.video_id,
            source = source.name(),
            comments = video.comments.len(),
            "Ingested video"
        );
        Ok(video)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        _prep: IngestPrep,
        video: VideoInfo,
    ) -> anyhow::Result<Action> {
        memory.set_global(VIDEO_KEY, &video)?;
        Ok(Action::DEFAULT)
    }
}
