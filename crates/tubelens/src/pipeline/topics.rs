//! Topic extraction and the transcript/comment embedding passes.

use std::sync::Arc;

use anyhow::{Context, bail, ensure};
use async_trait::async_trait;
use tracing::{debug, info};
use tubelens_flow::{Action, Memory, Node};
use tubelens_types::{
    CommentThread, EmbeddingVector, TopicOutline, VideoInfo, new_short_id,
};

use super::prompts::{parse_topics, topic_prompt};
use super::{Resources, TOPICS_KEY, VIDEO_KEY};

/// Shared prep for nodes that work on the ingested video.
pub struct VideoPrep {
    video: VideoInfo,
    resources: Arc<Resources>,
}

fn video_prep(memory: &Memory<Resources>) -> anyhow::Result<VideoPrep> {
    Ok(VideoPrep {
        video: memory.require(VIDEO_KEY)?,
        resources: memory.shared_resources(),
    })
}

/// One embeddable text of a topic outline.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatText {
    pub id: String,
    pub parent_id: Option<String>,
    pub text: String,
}

/// Flatten outlines in `[topic, its questions…, next topic, …]` order.
///
/// Question ids are `<topicId>.<questionId>`.
pub fn flatten_outlines(outlines: &[TopicOutline]) -> Vec<FlatText> {
    let mut flat = Vec::new();
    for topic in outlines {
        flat.push(FlatText {
            id: topic.id.clone(),
            parent_id: None,
            text: topic.title.clone(),
        });
        for question in &topic.questions {
            flat.push(FlatText {
                id: format!("{}.{}", topic.id, new_short_id()),
                parent_id: Some(topic.id.clone()),
                text: question.clone(),
            });
        }
    }
    flat
}

/// Rebuild outlines from stored transcript embeddings.
fn outlines_from_embeddings(vectors: &[EmbeddingVector]) -> Vec<TopicOutline> {
    let mut outlines: Vec<TopicOutline> = vectors
        .iter()
        .filter(|v| v.is_topic())
        .map(|v| TopicOutline {
            id: v.id.clone(),
            title: v.text.clone(),
            questions: Vec::new(),
        })
        .collect();

    for question in vectors.iter().filter(|v| !v.is_topic()) {
        if let Some(topic) = outlines
            .iter_mut()
            .find(|t| question.parent_id.as_deref() == Some(t.id.as_str()))
        {
            topic.questions.push(question.text.clone());
        }
    }
    outlines
}

// ─────────────────────────────────────────────────────────────────────────────
// ExtractTopics
// ─────────────────────────────────────────────────────────────────────────────

/// Asks the LLM for topics and questions, embeds them and stores the
/// vectors. Publishes the outlines under `topics`.
///
/// A video whose transcript is already embedded reuses the stored vectors
/// without calling the LLM.
pub struct ExtractTopics;

#[async_trait]
impl Node<Resources> for ExtractTopics {
    type Prep = VideoPrep;
    type Exec = Vec<TopicOutline>;

    fn name(&self) -> &str {
        "extract_topics"
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<VideoPrep> {
        video_prep(memory)
    }

    async fn execute(&self, prep: &VideoPrep) -> anyhow::Result<Vec<TopicOutline>> {
        let video = &prep.video;
        let resources = &prep.resources;

        let stored = resources.store.transcript_embeddings(&video.video_id)?;
        if !stored.is_empty() {
            info!(
                video_id = %video.video_id,
                vectors = stored.len(),
                "Transcript already embedded"
            );
            return Ok(outlines_from_embeddings(&stored));
        }

        let prompt = topic_prompt(&video.title, &video.transcript);
        let response = resources
            .llm
            .complete(&prompt)
            .await
            .context("topic extraction request failed")?;
        let outlines = parse_topics(&response).context("extract_topics")?;
        if outlines.is_empty() {
            bail!("no topics found in the reply for video {}", video.video_id);
        }

        let flat = flatten_outlines(&outlines);
        let texts: Vec<&str> = flat.iter().map(|f| f.text.as_str()).collect();
        let vectors = resources.batcher.embed(&texts).await?;
        ensure!(
            vectors.len() == flat.len(),
            "embedded {} of {} topic texts",
            vectors.len(),
            flat.len()
        );

        let embeddings: Vec<EmbeddingVector> = flat
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| EmbeddingVector {
                id: text.id,
                parent_id: text.parent_id,
                text: text.text,
                vector,
            })
            .collect();
        resources
            .store
            .insert_transcript_embeddings(&video.video_id, &embeddings)?;

        info!(
            video_id = %video.video_id,
            topics = outlines.len(),
            vectors = embeddings.len(),
            "Embedded transcript topics"
        );
        Ok(outlines)
    }

    async fn finalize(
        &self,
        memory: &mut Memory<Resources>,
        _prep: VideoPrep,
        outlines: Vec<TopicOutline>,
    ) -> anyhow::Result<Action> {
        memory.set_global(TOPICS_KEY, &outlines)?;
        Ok(Action::DEFAULT)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EmbedComments
// ─────────────────────────────────────────────────────────────────────────────

/// Group top-level comments with their replies, in ingestion order.
pub fn comment_threads(video: &VideoInfo) -> Vec<CommentThread> {
    video
        .top_level_comments()
        .map(|top| CommentThread {
            comment_id: top.id.clone(),
            main_comment: top.text.clone(),
            replies: video
                .comments
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(top.id.as_str()))
                .map(|c| c.text.clone())
                .collect(),
        })
        .collect()
}

/// Embeds each top-level comment thread as a YAML document.
///
/// Skipped when the video's comments are already embedded.
pub struct EmbedComments;

#[async_trait]
impl Node<Resources> for EmbedComments {
    type Prep = VideoPrep;
    type Exec = usize;

    fn name(&self) -> &str {
        "embed_comments"
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<VideoPrep> {
        video_prep(memory)
    }

    async fn execute(&self, prep: &VideoPrep) -> anyhow::Result<usize> {
        let video = &prep.video;
        let resources = &prep.resources;

        let existing = resources.store.comment_embedding_count(&video.video_id)?;
        if existing > 0 {
            info!(video_id = %video.video_id, vectors = existing, "Comments already embedded");
            return Ok(existing);
        }

        let threads = comment_threads(video);
        if threads.is_empty() {
            debug!(video_id = %video.video_id, "No comments to embed");
            return Ok(0);
        }

        let documents = threads
            .iter()
            .map(serde_yaml::to_string)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to serialize comment threads")?;
        let vectors = resources.batcher.embed(&documents).await?;
        ensure!(
            vectors.len() == threads.len(),
            "embedded {} of {} comment threads",
            vectors.len(),
            threads.len()
        );

        let embeddings: Vec<EmbeddingVector> = threads
            .iter()
            .zip(documents)
            .zip(vectors)
            .map(|((thread, text), vector)| {
                EmbeddingVector::topic(thread.comment_id.clone(), text, vector)
            })
            .collect();
        resources
            .store
            .insert_comment_embeddings(&video.video_id, &embeddings)?;

        info!(video_id = %video.video_id, vectors = embeddings.len(), "Embedded comments");
        Ok(embeddings.len())
    }

    async fn finalize(
        &self,
        _memory: &mut Memory<Resources>,
        _prep: VideoPrep,
        _count: usize,
    ) -> anyhow::Result<Action> {
        Ok(Action::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelens_types::{CommentRecord, VideoId};

    fn outline(id: &str, title: &str, questions: &[&str]) -> TopicOutline {
        TopicOutline {
            id: id.to_string(),
            title: title.to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn test_flatten_order_and_ids() {
        let outlines = vec![
            outline("t1", "Salt", &["Why?", "How much?"]),
            outline("t2", "Time", &["How long?"]),
        ];
        let flat = flatten_outlines(&outlines);

        let texts: Vec<_> = flat.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Salt", "Why?", "How much?", "Time", "How long?"]);

        assert_eq!(flat[0].id, "t1");
        assert_eq!(flat[0].parent_id, None);
        assert!(flat[1].id.starts_with("t1."));
        assert_eq!(flat[1].parent_id.as_deref(), Some("t1"));
        assert_ne!(flat[1].id, flat[2].id);
        assert_eq!(flat[4].parent_id.as_deref(), Some("t2"));
    }

    #[test]
    fn test_outlines_round_trip_through_vectors() {
        let outlines = vec![outline("t1", "Salt", &["Why?"]), outline("t2", "Time", &[])];
        let vectors: Vec<_> = flatten_outlines(&outlines)
            .into_iter()
            .map(|f| EmbeddingVector {
                id: f.id,
                parent_id: f.parent_id,
                text: f.text,
                vector: vec![0.0; 2],
            })
            .collect();

        assert_eq!(outlines_from_embeddings(&vectors), outlines);
    }

    #[test]
    fn test_comment_threads_group_replies() {
        let video = VideoInfo {
            video_id: VideoId::parse("Lfr2KvIS2nY").unwrap(),
            title: "t".to_string(),
            thumbnail_url: String::new(),
            transcript: String::new(),
            comments: vec![
                CommentRecord::top_level("c1", "first"),
                CommentRecord::reply("r1", "c1", "reply one"),
                CommentRecord::top_level("c2", "second"),
                CommentRecord::reply("r2", "c1", "reply two"),
            ],
        };

        let threads = comment_threads(&video);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment_id, "c1");
        assert_eq!(threads[0].replies, vec!["reply one", "reply two"]);
        assert!(threads[1].replies.is_empty());

        let yaml = serde_yaml::to_string(&threads[0]).unwrap();
        assert!(yaml.contains("mainComment: first"));
        assert!(yaml.contains("- reply one"));
        assert!(!serde_yaml::to_string(&threads[1]).unwrap().contains("replies"));
    }
}
