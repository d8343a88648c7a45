//! Run command - the full ingest, embed and post-process pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use tubelens::pipeline::{PipelineOptions, Resources, run_pipeline};
use tubelens::render::HtmlRenderer;
use tubelens::sources::{
    DEFAULT_SUPADATA_BASE, DEFAULT_YOUTUBE_BASE, FixtureSource, SharedSource, YoutubeSource,
    YoutubeSourceConfig,
};
use tubelens_config::{PipelineMode, Service, TubelensConfig, require_api_key};
use tubelens_llm::{
    DEFAULT_EMBEDDING_MODEL, EmbeddingBatcher, GeminiBackend, GeminiConfig, GeminiEmbedder,
    SharedBackend,
};
use tubelens_store::DistanceMetric;
use tubelens_types::VideoId;

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Video URL or 11-character id
    pub video: String,

    /// Post-processing stage: similarity or content
    #[arg(long)]
    pub mode: Option<PipelineMode>,

    /// Comments ranked per topic
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Read the video from a JSON fixture instead of the network
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory for rendered pages
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let video_id = VideoId::parse(&args.video)?;
    let config = &ctx.config;

    let pipeline = config.pipeline_or_default();
    let mut options = PipelineOptions::from(&pipeline);
    if let Some(k) = args.k {
        options.similarity_k = k;
    }
    let mode = args.mode.unwrap_or(pipeline.mode);
    let metric: DistanceMetric = pipeline.distance.parse()?;

    let store_path = ctx.store_path(args.db.as_deref())?;
    let store = ctx.open_store(&store_path)?;

    let source: SharedSource = match &args.fixture {
        Some(path) => Arc::new(FixtureSource::from_file(path)?),
        None => Arc::new(youtube_source(config)?),
    };

    let gemini_key = require_api_key(
        Service::Gemini,
        config.llm.as_ref().and_then(|l| l.api_key.as_deref()),
    )?;
    let llm = gemini_backend(config, &gemini_key.value)?;
    let batcher = embedding_batcher(config, &gemini_key.value)?;

    let output_dir = args.out_dir.unwrap_or_else(|| config.output_dir());

    info!(
        video_id = %video_id,
        source = source.name(),
        store = %store_path.display(),
        "Resources ready"
    );

    let resources = Resources {
        store,
        source,
        llm,
        batcher,
        renderer: Arc::new(HtmlRenderer::new()?),
        metric,
        output_dir,
    };

    let outcome = run_pipeline(resources, &video_id, mode, &options).await?;
    match outcome.output_path {
        Some(path) => println!("{}", path.display()),
        None => println!("Pipeline finished without output ({})", outcome.action),
    }
    Ok(())
}

fn youtube_source(config: &TubelensConfig) -> Result<YoutubeSource> {
    let youtube = config.youtube_or_default();
    let transcript = config.transcript_or_default();

    let youtube_key = require_api_key(Service::Youtube, youtube.api_key.as_deref())?;
    let transcript_key = require_api_key(Service::Supadata, transcript.api_key.as_deref())?;

    let source_config = YoutubeSourceConfig::new(youtube_key.value, transcript_key.value)
        .with_youtube_base(youtube.base_url.as_deref().unwrap_or(DEFAULT_YOUTUBE_BASE))
        .with_transcript_base(
            transcript
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_SUPADATA_BASE),
        )
        .with_max_comment_pages(youtube.max_comment_pages);

    YoutubeSource::new(source_config).context("failed to create YouTube client")
}

fn gemini_config(config: &TubelensConfig, api_key: &str) -> GeminiConfig {
    let llm = config.llm_or_default();
    let mut gemini = GeminiConfig::new(api_key);
    if let Some(url) = llm.base_url {
        gemini = gemini.with_base_url(url);
    }
    if let Some(secs) = llm.timeout_secs {
        gemini = gemini.with_timeout(Duration::from_secs(secs));
    }
    gemini
}

fn gemini_backend(config: &TubelensConfig, api_key: &str) -> Result<SharedBackend> {
    let mut gemini = gemini_config(config, api_key);
    if let Some(model) = config.llm_or_default().model {
        gemini = gemini.with_model(model);
    }
    Ok(Arc::new(GeminiBackend::new(gemini)?))
}

fn embedding_batcher(config: &TubelensConfig, api_key: &str) -> Result<EmbeddingBatcher> {
    let embedding = config.embedding_or_default();
    let model = embedding
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let embedder = GeminiEmbedder::new(
        gemini_config(config, api_key).with_model(model),
        embedding.dimensions,
    )?;

    Ok(EmbeddingBatcher::new(Arc::new(embedder))
        .with_chunk_size(embedding.batch_size)
        .with_pacing(Duration::from_millis(embedding.pacing_ms)))
}
