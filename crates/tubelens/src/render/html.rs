//! Handlebars-backed HTML renderer.

use handlebars::Handlebars;
use serde_json::{Value, json};
use tubelens_types::{CommentRecord, RankedComment, SimilarityMatch};

use super::{ContentPage, MatchesPage, RenderError, Renderer};

const CONTENT_TEMPLATE: &str = "content";
const COMMENTS_TEMPLATE: &str = "comments";

/// Renders the bundled page templates.
pub struct HtmlRenderer {
    registry: Handlebars<'static>,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(CONTENT_TEMPLATE, include_str!("../../templates/content.hbs"))?;
        registry.register_template_string(
            COMMENTS_TEMPLATE,
            include_str!("../../templates/comments.hbs"),
        )?;
        Ok(Self { registry })
    }
}

impl Renderer for HtmlRenderer {
    fn render_content(&self, page: &ContentPage) -> Result<String, RenderError> {
        let topics: Vec<Value> = page
            .topics
            .iter()
            .map(|topic| {
                json!({
                    "title": topic.display_title(),
                    "original_title": topic.title,
                    "questions": topic.questions,
                })
            })
            .collect();

        let data = json!({ "header": page.header, "topics": topics });
        Ok(self.registry.render(CONTENT_TEMPLATE, &data)?)
    }

    fn render_matches(&self, page: &MatchesPage) -> Result<String, RenderError> {
        let matches: Vec<Value> = page.matches.iter().map(match_view).collect();
        let data = json!({ "header": page.header, "matches": matches });
        Ok(self.registry.render(COMMENTS_TEMPLATE, &data)?)
    }
}

fn match_view(matched: &SimilarityMatch) -> Value {
    json!({
        "topic_text": matched.topic_text,
        "is_question": matched.parent_id.is_some(),
        "ranked": matched.ranked.iter().map(ranked_view).collect::<Vec<_>>(),
    })
}

fn ranked_view(ranked: &RankedComment) -> Value {
    json!({
        "text": ranked.text,
        "like_count": ranked.like_count,
        "distance": format!("{:.3}", ranked.distance),
        "replies": ranked.replies.iter().map(reply_view).collect::<Vec<_>>(),
    })
}

fn reply_view(reply: &CommentRecord) -> Value {
    json!({ "text": reply.text, "like_count": reply.like_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PageHeader;
    use tubelens_types::{ProcessedQuestion, ProcessedTopic};

    fn header() -> PageHeader {
        PageHeader {
            title: "Fish & Chips".to_string(),
            video_url: "https://www.youtube.com/watch?v=Lfr2KvIS2nY".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/Lfr2KvIS2nY/maxresdefault.jpg".to_string(),
        }
    }

    #[test]
    fn test_render_content() {
        let renderer = HtmlRenderer::new().unwrap();
        let page = ContentPage {
            header: header(),
            topics: vec![ProcessedTopic {
                topic_id: "t1".to_string(),
                title: "Batter".to_string(),
                rephrased_title: "Getting the batter right".to_string(),
                questions: vec![ProcessedQuestion {
                    original: "Beer or water?".to_string(),
                    rephrased: "Which liquid makes a lighter batter?".to_string(),
                    answer: "Cold <b>beer</b>.".to_string(),
                }],
            }],
        };

        let html = renderer.render_content(&page).unwrap();
        assert!(html.contains("Fish &amp; Chips"));
        assert!(html.contains("href=\"https://www.youtube.com/watch?v=Lfr2KvIS2nY\""));
        assert!(html.contains("Getting the batter right"));
        assert!(html.contains("Which liquid makes a lighter batter?"));
        assert!(html.contains("Cold &lt;b&gt;beer&lt;/b&gt;."));
    }

    #[test]
    fn test_render_matches() {
        let renderer = HtmlRenderer::new().unwrap();
        let page = MatchesPage {
            header: header(),
            matches: vec![SimilarityMatch {
                topic_id: "t1".to_string(),
                topic_text: "Batter".to_string(),
                parent_id: None,
                k: 3,
                ranked: vec![RankedComment {
                    comment_id: "c1".to_string(),
                    text: "Use sparkling water".to_string(),
                    parent_id: None,
                    like_count: 7,
                    distance: 0.12345,
                    replies: vec![CommentRecord::reply("r1", "c1", "works for me")],
                }],
            }],
        };

        let html = renderer.render_matches(&page).unwrap();
        assert!(html.contains("Batter"));
        assert!(html.contains("Use sparkling water"));
        assert!(html.contains("0.123"));
        assert!(html.contains("works for me"));
    }

    #[test]
    fn test_render_empty_matches() {
        let renderer = HtmlRenderer::new().unwrap();
        let page = MatchesPage {
            header: header(),
            matches: vec![],
        };
        let html = renderer.render_matches(&page).unwrap();
        assert!(html.contains("No topics"));
    }
}
