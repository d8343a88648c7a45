//! The tubelens pipeline: node implementations and flow assembly.
//!
//! ```text
//! pipeline
//! ├── pre-process (Flow)
//! │     ingest_video → extract_topics → embed_comments → choose_mode
//! ├── similarity ─► match_topics (ParallelFlow: match_topic) → render_matches
//! └── content    ─► process_topics (ParallelFlow: process_topic) → render_content
//! ```
//!
//! Nodes exchange data only through [`Memory`] globals named by the `*_KEY`
//! constants below.

mod content;
mod ingest;
mod mode;
pub mod prompts;
mod similarity;
mod topics;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;
use tubelens_config::{PipelineConfig, PipelineMode};
use tubelens_flow::{Action, Flow, FlowBuilder, Memory, ParallelFlow};
use tubelens_llm::{EmbeddingBatcher, SharedBackend};
use tubelens_store::{DEFAULT_TOP_K, Database, DistanceMetric};
use tubelens_types::VideoId;

use crate::render::SharedRenderer;
use crate::sources::SharedSource;

pub use content::{ProcessTopic, RenderContent, TopicFanout};
pub use ingest::IngestVideo;
pub use mode::{CONTENT, ChooseMode, SIMILARITY};
pub use similarity::{MatchTopic, RenderMatches, TranscriptFanout};
pub use topics::{EmbedComments, ExtractTopics, comment_threads, flatten_outlines};

// ─────────────────────────────────────────────────────────────────────────────
// Memory keys
// ─────────────────────────────────────────────────────────────────────────────

pub const VIDEO_ID_KEY: &str = "video_id";
pub const MODE_KEY: &str = "mode";
pub const VIDEO_KEY: &str = "video";
pub const TOPICS_KEY: &str = "topics";
pub const MATCHES_KEY: &str = "matches";
pub const PROCESSED_KEY: &str = "processed_topics";
pub const OUTPUT_PATH_KEY: &str = "output_path";
/// Branch-local neighbor count for similarity matching.
pub const K_KEY: &str = "k";

// ─────────────────────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────────────────────

/// Collaborators shared by every node of a run.
pub struct Resources {
    pub store: Arc<Database>,
    pub source: SharedSource,
    pub llm: SharedBackend,
    pub batcher: EmbeddingBatcher,
    pub renderer: SharedRenderer,
    pub metric: DistanceMetric,
    pub output_dir: PathBuf,
}

/// Limits applied when assembling the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub similarity_k: usize,
    pub max_concurrency: Option<usize>,
    pub branch_max_visits: usize,
    pub flow_max_visits: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            similarity_k: DEFAULT_TOP_K,
            max_concurrency: None,
            branch_max_visits: tubelens_flow::DEFAULT_BRANCH_MAX_VISITS,
            flow_max_visits: tubelens_flow::DEFAULT_MAX_VISITS,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            similarity_k: config.similarity_k,
            max_concurrency: config.max_concurrency,
            branch_max_visits: config.branch_max_visits,
            flow_max_visits: config.flow_max_visits,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembly
// ─────────────────────────────────────────────────────────────────────────────

/// The pre-process flow; its terminal actions select the mode.
pub fn build_preprocess(options: &PipelineOptions) -> tubelens_flow::Result<Flow<Resources>> {
    let mut builder = FlowBuilder::new("pre_process");
    let ingest = builder.add(IngestVideo);
    let topics = builder.add(ExtractTopics);
    let comments = builder.add(EmbedComments);
    let mode = builder.add(ChooseMode);

    builder
        .then(ingest, topics)
        .then(topics, comments)
        .then(comments, mode)
        .max_visits(options.flow_max_visits);
    builder.build()
}

/// The full pipeline flow.
pub fn build_pipeline(options: &PipelineOptions) -> tubelens_flow::Result<Flow<Resources>> {
    let match_branch = {
        let mut builder = FlowBuilder::new("match_branch");
        builder.add(MatchTopic);
        builder.build()?
    };
    let mut match_topics = ParallelFlow::new(
        "match_topics",
        TranscriptFanout,
        match_branch,
        MATCHES_KEY,
    )
    .with_local(K_KEY, json!(options.similarity_k))
    .branch_max_visits(options.branch_max_visits);

    let content_branch = {
        let mut builder = FlowBuilder::new("content_branch");
        builder.add(ProcessTopic);
        builder.build()?
    };
    let mut process_topics = ParallelFlow::new(
        "process_topics",
        TopicFanout,
        content_branch,
        PROCESSED_KEY,
    )
    .branch_max_visits(options.branch_max_visits);

    if let Some(limit) = options.max_concurrency {
        match_topics = match_topics.max_concurrency(limit);
        process_topics = process_topics.max_concurrency(limit);
    }

    let mut builder = FlowBuilder::new("pipeline");
    let pre = builder.add_flow(build_preprocess(options)?);
    let matching = builder.add_flow(match_topics);
    let render_matches = builder.add(RenderMatches);
    let processing = builder.add_flow(process_topics);
    let render_content = builder.add(RenderContent);

    builder
        .entry(pre)
        .connect(pre, SIMILARITY, matching)
        .then(matching, render_matches)
        .connect(pre, CONTENT, processing)
        .then(processing, render_content)
        .max_visits(options.flow_max_visits);
    builder.build()
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub action: Action,
    pub output_path: Option<PathBuf>,
    /// Global memory at the end of the run.
    pub globals: Map<String, Value>,
}

/// Run the full pipeline for one video.
pub async fn run_pipeline(
    resources: Resources,
    video_id: &VideoId,
    mode: PipelineMode,
    options: &PipelineOptions,
) -> anyhow::Result<PipelineOutcome> {
    let flow = build_pipeline(options)?;
    let mut memory = Memory::new(resources)
        .with_global(VIDEO_ID_KEY, json!(video_id))
        .with_global(MODE_KEY, json!(mode.as_str()));

    info!(video_id = %video_id, mode = %mode, k = options.similarity_k, "Starting pipeline");
    let action = flow.run(&mut memory).await?;

    let output_path = memory.get::<PathBuf>(OUTPUT_PATH_KEY)?;
    info!(
        video_id = %video_id,
        action = %action,
        output = ?output_path,
        "Pipeline finished"
    );

    Ok(PipelineOutcome {
        action,
        output_path,
        globals: memory.global_snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelens_flow::Runnable;

    #[test]
    fn test_preprocess_ends_in_mode_actions() {
        let flow = build_preprocess(&PipelineOptions::default()).unwrap();
        let mut actions = flow.actions();
        actions.sort();
        assert_eq!(actions, vec![CONTENT, SIMILARITY]);
    }

    #[test]
    fn test_pipeline_builds() {
        let options = PipelineOptions {
            max_concurrency: Some(2),
            ..PipelineOptions::default()
        };
        let flow = build_pipeline(&options).unwrap();
        assert_eq!(flow.name(), "pipeline");
        assert_eq!(flow.len(), 5);
        assert_eq!(flow.actions(), vec![Action::DEFAULT]);
    }

    #[test]
    fn test_options_from_config() {
        let config = PipelineConfig {
            similarity_k: 7,
            ..PipelineConfig::default()
        };
        let options = PipelineOptions::from(&config);
        assert_eq!(options.similarity_k, 7);
        assert_eq!(options.flow_max_visits, config.flow_max_visits);
    }
}
