//! YouTube Data API v3 plus Supadata transcripts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tubelens_types::{CommentRecord, Timestamp, VideoId, VideoInfo};

use super::{SourceError, VideoSource};

pub const DEFAULT_YOUTUBE_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_SUPADATA_BASE: &str = "https://api.supadata.ai/v1";

/// Maximum page size accepted by `commentThreads`.
const COMMENT_PAGE_SIZE: &str = "100";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for [`YoutubeSource`].
#[derive(Debug, Clone)]
pub struct YoutubeSourceConfig {
    pub youtube_api_key: String,
    pub transcript_api_key: String,
    pub youtube_base: String,
    pub transcript_base: String,
    /// Stop after this many comment pages (drain all when `None`).
    pub max_comment_pages: Option<usize>,
    pub timeout: Duration,
}

impl YoutubeSourceConfig {
    pub fn new(youtube_api_key: impl Into<String>, transcript_api_key: impl Into<String>) -> Self {
        Self {
            youtube_api_key: youtube_api_key.into(),
            transcript_api_key: transcript_api_key.into(),
            youtube_base: DEFAULT_YOUTUBE_BASE.to_string(),
            transcript_base: DEFAULT_SUPADATA_BASE.to_string(),
            max_comment_pages: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_youtube_base(mut self, url: impl Into<String>) -> Self {
        self.youtube_base = url.into();
        self
    }

    pub fn with_transcript_base(mut self, url: impl Into<String>) -> Self {
        self.transcript_base = url.into();
        self
    }

    pub fn with_max_comment_pages(mut self, pages: Option<usize>) -> Self {
        self.max_comment_pages = pages;
        self
    }
}

/// Fetches video details and comment threads from YouTube and the
/// transcript from Supadata.
pub struct YoutubeSource {
    client: Client,
    config: YoutubeSourceConfig,
}

impl YoutubeSource {
    pub fn new(config: YoutubeSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn video_details(&self, video_id: &VideoId) -> Result<VideoSnippet, SourceError> {
        let url = format!("{}/videos", self.config.youtube_base.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[
                ("part", "snippet"),
                ("id", video_id.as_str()),
                ("key", self.config.youtube_api_key.as_str()),
            ])
            .send()
            .await?;

        let list: VideoListResponse = parse_json("YouTube", response).await?;
        list.items
            .into_iter()
            .next()
            .map(|item| item.snippet)
            .ok_or_else(|| SourceError::NotFound(video_id.to_string()))
    }

    async fn comment_page(
        &self,
        video_id: &VideoId,
        page_token: Option<&str>,
    ) -> Result<CommentThreadList, SourceError> {
        let url = format!(
            "{}/commentThreads",
            self.config.youtube_base.trim_end_matches('/')
        );
        let mut query = vec![
            ("part", "snippet,replies"),
            ("videoId", video_id.as_str()),
            ("order", "relevance"),
            ("textFormat", "plainText"),
            ("maxResults", COMMENT_PAGE_SIZE),
            ("key", self.config.youtube_api_key.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.client.get(url).query(&query).send().await?;
        parse_json("YouTube", response).await
    }

    /// Every comment of the video, following `nextPageToken` until exhausted.
    async fn comments(&self, video_id: &VideoId) -> Result<Vec<CommentRecord>, SourceError> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.comment_page(video_id, page_token.as_deref()).await?;
            pages += 1;
            page_token = page.next_page_token.clone();
            comments.extend(comments_from_threads(page));

            debug!(video_id = %video_id, pages, comments = comments.len(), "Fetched comment page");

            let capped = self.config.max_comment_pages.is_some_and(|max| pages >= max);
            if page_token.is_none() || capped {
                break;
            }
        }
        Ok(comments)
    }

    async fn transcript(&self, video_id: &VideoId) -> Result<String, SourceError> {
        let url = format!(
            "{}/youtube/transcript",
            self.config.transcript_base.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.config.transcript_api_key)
            .query(&[("videoId", video_id.as_str()), ("text", "true")])
            .send()
            .await?;

        let transcript: TranscriptResponse = parse_json("Supadata", response).await?;
        Ok(transcript.content)
    }
}

#[async_trait]
impl VideoSource for YoutubeSource {
    async fn fetch(&self, video_id: &VideoId) -> Result<VideoInfo, SourceError> {
        let snippet = self.video_details(video_id).await?;
        let transcript = self.transcript(video_id).await?;
        let comments = self.comments(video_id).await?;

        info!(
            video_id = %video_id,
            comments = comments.len(),
            transcript_chars = transcript.len(),
            "Fetched video"
        );

        Ok(VideoInfo {
            video_id: video_id.clone(),
            thumbnail_url: snippet.thumbnails.best_url().unwrap_or_default(),
            title: snippet.title,
            transcript,
            comments,
        })
    }

    fn name(&self) -> &str {
        "youtube"
    }
}

async fn parse_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(SourceError::Api {
            service,
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

/// Flatten a page of threads into top-level comments each followed by
/// its replies.
fn comments_from_threads(list: CommentThreadList) -> Vec<CommentRecord> {
    let mut comments = Vec::new();
    for thread in list.items {
        let top = thread.snippet.top_level_comment;
        comments.push(CommentRecord {
            id: top.id,
            text: top.snippet.text_display,
            parent_id: None,
            like_count: top.snippet.like_count,
            published_at: top.snippet.published_at,
            total_reply_count: Some(thread.snippet.total_reply_count),
        });

        for reply in thread.replies.map(|r| r.comments).unwrap_or_default() {
            comments.push(CommentRecord {
                id: reply.id,
                text: reply.snippet.text_display,
                parent_id: reply.snippet.parent_id.filter(|p| !p.is_empty()),
                like_count: reply.snippet.like_count,
                published_at: reply.snippet.published_at,
                total_reply_count: None,
            });
        }
    }
    comments
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    standard: Option<Thumbnail>,
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(self) -> Option<String> {
        self.maxres
            .or(self.standard)
            .or(self.high)
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadList {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<CommentThreadItem>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadItem {
    snippet: ThreadSnippet,
    replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: ApiComment,
    #[serde(default)]
    total_reply_count: i64,
}

#[derive(Debug, Deserialize)]
struct ThreadReplies {
    #[serde(default)]
    comments: Vec<ApiComment>,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: String,
    parent_id: Option<String>,
    #[serde(default)]
    like_count: i64,
    published_at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
