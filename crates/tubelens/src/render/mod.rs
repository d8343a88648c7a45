//! HTML rendering of pipeline results.

mod html;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tubelens_types::{ProcessedTopic, SimilarityMatch, VideoInfo};

pub use html::HtmlRenderer;

/// Errors raised while rendering or writing a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Title, link and thumbnail shown at the top of every page.
#[derive(Debug, Clone, Serialize)]
pub struct PageHeader {
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: String,
}

impl PageHeader {
    pub fn from_video(video: &VideoInfo) -> Self {
        Self {
            title: video.title.clone(),
            video_url: video.video_id.watch_url(),
            thumbnail_url: video.thumbnail_url.clone(),
        }
    }
}

/// The content-mode summary page.
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub header: PageHeader,
    pub topics: Vec<ProcessedTopic>,
}

/// The similarity-mode page: every topic with its nearest comments.
#[derive(Debug, Clone)]
pub struct MatchesPage {
    pub header: PageHeader,
    pub matches: Vec<SimilarityMatch>,
}

/// Turns pipeline results into documents.
pub trait Renderer: Send + Sync {
    fn render_content(&self, page: &ContentPage) -> Result<String, RenderError>;

    fn render_matches(&self, page: &MatchesPage) -> Result<String, RenderError>;

    /// File extension of rendered documents.
    fn extension(&self) -> &str {
        "html"
    }
}

pub type SharedRenderer = Arc<dyn Renderer>;

/// File-name slug for a video title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "video".to_string()
    } else {
        slug
    }
}

/// Write `contents` to `<dir>/<name>`, creating `dir` if needed.
pub fn write_page(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(dir).map_err(|source| RenderError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|source| RenderError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
