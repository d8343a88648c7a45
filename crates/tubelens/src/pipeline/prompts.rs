//! Prompt text and parsing of the fenced YAML replies.

use anyhow::Context;
use serde::Deserialize;
use tubelens_llm::extract_fenced_block;
use tubelens_types::{ProcessedQuestion, ProcessedTopic, TopicOutline, new_short_id};

/// Prompt asking for the interesting topics of a transcript.
pub fn topic_prompt(title: &str, transcript: &str) -> String {
    format!(
        r#"You are an expert content analyzer. Given a YouTube video transcript, identify at least 2 or more most interesting topics discussed and generate at most 3 most thought-provoking questions for each topic.
These questions don't need to be directly asked in the video. It's good to have clarification questions.

VIDEO TITLE: {title}

TRANSCRIPT:
{transcript}

Format your response in YAML:

```yaml
topics:
  - title: |
      First topic title
    questions:
      - |
        First question about this topic
      - |
        Second question about this topic
```
"#
    )
}

/// Prompt asking for a reader-friendly rewrite of one topic, answered
/// from the transcript.
pub fn content_prompt(title: &str, transcript: &str, topic: &TopicOutline) -> String {
    let questions = topic
        .questions
        .iter()
        .map(|q| format!("- {q}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are writing a short study guide for a YouTube video. Rewrite the topic title so it is engaging and clear, then rephrase each question and answer it using only the transcript. Keep answers to a few sentences.

VIDEO TITLE: {title}

TRANSCRIPT:
{transcript}

TOPIC: {topic_title}

QUESTIONS:
{questions}

Format your response in YAML:

```yaml
rephrased_title: |
  Engaging topic title
questions:
  - original: |
      The question exactly as given
    rephrased: |
      A clearer version of the question
    answer: |
      The answer, based on the transcript
```
"#,
        topic_title = topic.title,
    )
}

#[derive(Debug, Deserialize)]
struct TopicDocument {
    #[serde(default)]
    topics: Vec<RawTopic>,
}

#[derive(Debug, Deserialize)]
struct RawTopic {
    title: String,
    #[serde(default)]
    questions: Vec<String>,
}

/// Parse the topic reply into outlines with fresh ids.
pub fn parse_topics(response: &str) -> anyhow::Result<Vec<TopicOutline>> {
    let yaml = extract_fenced_block(response, "yaml");
    let document: TopicDocument =
        serde_yaml::from_str(yaml).context("topic reply is not valid YAML")?;

    Ok(document
        .topics
        .into_iter()
        .map(|raw| TopicOutline {
            id: new_short_id(),
            title: raw.title.trim().to_string(),
            questions: raw
                .questions
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
        })
        .filter(|topic| !topic.title.is_empty())
        .collect())
}

#[derive(Debug, Deserialize)]
struct ContentDocument {
    #[serde(default)]
    rephrased_title: String,
    #[serde(default)]
    questions: Vec<RawProcessedQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawProcessedQuestion {
    original: String,
    #[serde(default)]
    rephrased: String,
    #[serde(default)]
    answer: String,
}

/// Parse the content reply for `topic`.
pub fn parse_processed_topic(
    response: &str,
    topic: &TopicOutline,
) -> anyhow::Result<ProcessedTopic> {
    let yaml = extract_fenced_block(response, "yaml");
    let document: ContentDocument = serde_yaml::from_str(yaml)
        .with_context(|| format!("content reply for topic '{}' is not valid YAML", topic.id))?;

    let questions = document
        .questions
        .into_iter()
        .map(|q| {
            let original = q.original.trim().to_string();
            let rephrased = match q.rephrased.trim() {
                "" => original.clone(),
                text => text.to_string(),
            };
            ProcessedQuestion {
                original,
                rephrased,
                answer: q.answer.trim().to_string(),
            }
        })
        .collect();

    Ok(ProcessedTopic {
        topic_id: topic.id.clone(),
        title: topic.title.clone(),
        rephrased_title: document.rephrased_title.trim().to_string(),
        questions,
    })
}
