//! Topic outlines extracted from a transcript and their rewritten forms.

use serde::{Deserialize, Serialize};

/// A topic and its questions, as extracted from a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicOutline {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// A question rephrased and answered for the content summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedQuestion {
    pub original: String,
    pub rephrased: String,
    pub answer: String,
}

/// A topic after the content pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTopic {
    pub topic_id: String,
    pub title: String,
    pub rephrased_title: String,
    #[serde(default)]
    pub questions: Vec<ProcessedQuestion>,
}

impl ProcessedTopic {
    /// The title to display, falling back to the original.
    pub fn display_title(&self) -> &str {
        if self.rephrased_title.trim().is_empty() {
            &self.title
        } else {
            &self.rephrased_title
        }
    }
}
