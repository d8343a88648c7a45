//! Similarity mode: rank comments against every topic and question.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};
use tubelens_flow::{Action, Fanout, Memory, Node};
use tubelens_store::{DEFAULT_TOP_K, SimilarityMatcher};
use tubelens_types::{EmbeddingVector, SimilarityMatch, VideoId, VideoInfo};

use super::{K_KEY, MATCHES_KEY, OUTPUT_PATH_KEY, Resources, VIDEO_ID_KEY, VIDEO_KEY};
use crate::render::{MatchesPage, PageHeader, slugify, write_page};

/// Fans out over the stored transcript vectors of the video.
pub struct TranscriptFanout;

#[async_trait]
impl Fanout<Resources> for TranscriptFanout {
    async fn items(&self, memory: &mut Memory<Resources>) -> anyhow::Result<Vec<Value>> {
        let video_id: VideoId = memory.require(VIDEO_ID_KEY)?;
        let vectors = memory.resources().store.transcript_embeddings(&video_id)?;
        vectors
            .iter()
            .map(|v| serde_json::to_value(v).context("failed to encode transcript vector"))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MatchTopic
// ─────────────────────────────────────────────────────────────────────────────

pub struct MatchPrep {
    video_id: VideoId,
    topic: EmbeddingVector,
    k: usize,
    resources: Arc<Resources>,
}

/// Ranks comments against the branch's transcript vector, stores the
/// ranking and fills the branch slot with it.
pub struct MatchTopic;

#[async_trait]
impl Node<Resources> for MatchTopic {
    type Prep = MatchPrep;
    type Exec = SimilarityMatch;

    fn name(&self) -> &str {
        "match_topic"
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<MatchPrep> {
        Ok(MatchPrep {
            video_id: memory.require(VIDEO_ID_KEY)?,
            topic: memory.item()?,
            k: memory.get(K_KEY)?.unwrap_or(DEFAULT_TOP_K),
            resources: memory.shared_resources(),
        })
    }

    async fn execute(&self, prep: &MatchPrep) -> anyhow::Result<SimilarityMatch> {
        let matcher = SimilarityMatcher::new(Arc::clone(&prep.resources.store), prep.k)
            .with_metric(prep.resources.metric);
        let matched = matcher.find_matches(&prep.video_id, &prep.topic)?;
        matcher.persist(&prep.video_id, &matched)?;
        Ok(matched)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        prep: MatchPrep,
        matched: SimilarityMatch,
    ) -> anyhow::Result<Action> {
        debug!(
            index = ?memory.index(),
            topic_id = %prep.topic.id,
            ranked = matched.ranked.len(),
            "Topic matched"
        );
        let slot = memory
            .slot()
            .context("match_topic must run inside a fan-out branch")?;
        slot.fill_with(&matched)?;
        Ok(Action::DEFAULT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderMatches
// ─────────────────────────────────────────────────────────────────────────────

pub struct RenderPrep<T> {
    pub(super) video: VideoInfo,
    pub(super) results: Vec<T>,
    pub(super) resources: Arc<Resources>,
}

/// Collect the filled slots of a published fan-out array.
pub(super) fn filled_results<T: serde::de::DeserializeOwned>(
    memory: &Memory<Resources>,
    key: &str,
) -> anyhow::Result<Vec<T>> {
    let slots: Vec<Option<T>> = memory.get(key)?.unwrap_or_default();
    let total = slots.len();
    let filled: Vec<T> = slots.into_iter().flatten().collect();
    if filled.len() < total {
        warn!(
            stage = key,
            missing = total - filled.len(),
            total,
            "Some branches produced no result"
        );
    }
    Ok(filled)
}

/// Renders the topic rankings to `<slug>-comments.html`.
pub struct RenderMatches;

#[async_trait]
impl Node<Resources> for RenderMatches {
    type Prep = RenderPrep<SimilarityMatch>;
    type Exec = PathBuf;

    fn name(&self) -> &str {
        "render_matches"
    }

    async fn prepare(
        &self,
        memory: &mut Memory<Resources>,
    ) -> anyhow::Result<RenderPrep<SimilarityMatch>> {
        Ok(RenderPrep {
            video: memory.require(VIDEO_KEY)?,
            results: filled_results(memory, MATCHES_KEY)?,
            resources: memory.shared_resources(),
        })
    }

    async fn execute(&self, prep: &RenderPrep<SimilarityMatch>) -> anyhow::Result<PathBuf> {
        let renderer = &prep.resources.renderer;
        let page = MatchesPage {
            header: PageHeader::from_video(&prep.video),
            matches: prep.results.clone(),
        };
        let html = renderer.render_matches(&page)?;
        let name = format!(
            "{}-comments.{}",
            slugify(&prep.video.title),
            renderer.extension()
        );
        let path = write_page(&prep.resources.output_dir, &name, &html)?;

        info!(
            video_id = %prep.video.video_id,
            topics = prep.results.len(),
            path = %path.display(),
            "Wrote comment matches"
        );
        Ok(path)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        _prep: RenderPrep<SimilarityMatch>,
        path: PathBuf,
    ) -> anyhow::Result<Action> {
        memory.set_global(OUTPUT_PATH_KEY, &path)?;
        Ok(Action::DEFAULT)
    }
}
