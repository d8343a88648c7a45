//! Content mode: rewrite and answer each topic, then render a summary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use tubelens_flow::{Action, Fanout, Memory, Node};
use tubelens_types::{ProcessedTopic, TopicOutline, VideoInfo};

use super::prompts::{content_prompt, parse_processed_topic};
use super::similarity::{RenderPrep, filled_results};
use super::{OUTPUT_PATH_KEY, PROCESSED_KEY, Resources, TOPICS_KEY, VIDEO_KEY};
use crate::render::{ContentPage, PageHeader, slugify, write_page};

/// Fans out over the topic outlines published by topic extraction.
pub struct TopicFanout;

#[async_trait]
impl Fanout<Resources> for TopicFanout {
    async fn items(&self, memory: &mut Memory<Resources>) -> anyhow::Result<Vec<Value>> {
        let topics: Vec<Value> = memory.get(TOPICS_KEY)?.unwrap_or_default();
        Ok(topics)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProcessTopic
// ─────────────────────────────────────────────────────────────────────────────

pub struct TopicPrep {
    topic: TopicOutline,
    title: String,
    transcript: String,
    resources: Arc<Resources>,
}

/// Asks the LLM to rephrase and answer one topic.
pub struct ProcessTopic;

#[async_trait]
impl Node<Resources> for ProcessTopic {
    type Prep = TopicPrep;
    type Exec = ProcessedTopic;

    fn name(&self) -> &str {
        "process_topic"
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<TopicPrep> {
        let video: VideoInfo = memory.require(VIDEO_KEY)?;
        Ok(TopicPrep {
            topic: memory.item()?,
            title: video.title,
            transcript: video.transcript,
            resources: memory.shared_resources(),
        })
    }

    async fn execute(&self, prep: &TopicPrep) -> anyhow::Result<ProcessedTopic> {
        let prompt = content_prompt(&prep.title, &prep.transcript, &prep.topic);
        let response = prep
            .resources
            .llm
            .complete(&prompt)
            .await
            .with_context(|| format!("content request for topic '{}' failed", prep.topic.id))?;
        parse_processed_topic(&response, &prep.topic)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        prep: TopicPrep,
        processed: ProcessedTopic,
    ) -> anyhow::Result<Action> {
        debug!(
            index = ?memory.index(),
            topic_id = %prep.topic.id,
            questions = processed.questions.len(),
            "Topic processed"
        );
        let slot = memory
            .slot()
            .context("process_topic must run inside a fan-out branch")?;
        slot.fill_with(&processed)?;
        Ok(Action::DEFAULT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderContent
// ─────────────────────────────────────────────────────────────────────────────

/// Renders the processed topics to `<slug>.html` and stores the HTML as
/// the video's summary.
pub struct RenderContent;

#[async_trait]
impl Node<Resources> for RenderContent {
    type Prep = RenderPrep<ProcessedTopic>;
    type Exec = PathBuf;

    fn name(&self) -> &str {
        "render_content"
    }

    async fn prepare(
        &self,
        memory: &mut Memory<Resources>,
    ) -> anyhow::Result<RenderPrep<ProcessedTopic>> {
        Ok(RenderPrep {
            video: memory.require(VIDEO_KEY)?,
            results: filled_results(memory, PROCESSED_KEY)?,
            resources: memory.shared_resources(),
        })
    }

    async fn execute(&self, prep: &RenderPrep<ProcessedTopic>) -> anyhow::Result<PathBuf> {
        let resources = &prep.resources;
        let page = ContentPage {
            header: PageHeader::from_video(&prep.video),
            topics: prep.results.clone(),
        };
        let html = resources.renderer.render_content(&page)?;
        resources
            .store
            .set_html_summary(&prep.video.video_id, &html)?;

        let name = format!(
            "{}.{}",
            slugify(&prep.video.title),
            resources.renderer.extension()
        );
        let path = write_page(&resources.output_dir, &name, &html)?;

        info!(
            video_id = %prep.video.video_id,
            topics = prep.results.len(),
            path = %path.display(),
            "Wrote content summary"
        );
        Ok(path)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        _prep: RenderPrep<ProcessedTopic>,
        path: PathBuf,
    ) -> anyhow::Result<Action> {
        memory.set_global(OUTPUT_PATH_KEY, &path)?;
        Ok(Action::DEFAULT)
    }
}
