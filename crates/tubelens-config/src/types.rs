//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [llm]          # completion model
//! [embedding]    # embedding model and batching
//! [youtube]      # YouTube Data API
//! [transcript]   # transcript provider
//! [store]        # SQLite database location
//! [pipeline]     # mode, matching and concurrency limits
//! [output]       # rendered HTML location
//! [logging]      # log file location
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TubelensConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<YoutubeConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TranscriptConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl TubelensConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: TubelensConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.youtube.is_some() {
            self.youtube = other.youtube;
        }
        if other.transcript.is_some() {
            self.transcript = other.transcript;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.pipeline.is_some() {
            self.pipeline = other.pipeline;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective `[llm]` section.
    pub fn llm_or_default(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    /// Effective `[embedding]` section.
    pub fn embedding_or_default(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    /// Effective `[youtube]` section.
    pub fn youtube_or_default(&self) -> YoutubeConfig {
        self.youtube.clone().unwrap_or_default()
    }

    /// Effective `[transcript]` section.
    pub fn transcript_or_default(&self) -> TranscriptConfig {
        self.transcript.clone().unwrap_or_default()
    }

    /// Effective `[pipeline]` section.
    pub fn pipeline_or_default(&self) -> PipelineConfig {
        self.pipeline.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Completion backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: Backend,
    /// Model identifier (backend default when unset).
    pub model: Option<String>,
    /// API key (prefer the env var; warns if set here).
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies, test servers).
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Supported completion providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
}

impl Backend {
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding model and request batching.
///
/// ```toml
/// [embedding]
/// model = "text-embedding-004"
/// dimensions = 768
/// batch_size = 100
/// pacing_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier (provider default when unset).
    pub model: Option<String>,
    /// Vector length enforced by the store.
    pub dimensions: usize,
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Delay between successive batch requests.
    pub pacing_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: None,
            dimensions: 768,
            batch_size: 100,
            pacing_ms: 5_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingestion
// ─────────────────────────────────────────────────────────────────────────────

/// YouTube Data API v3 settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Stop draining comment pages after this many (unbounded when unset).
    pub max_comment_pages: Option<usize>,
}

impl YoutubeConfig {
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Transcript provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl TranscriptConfig {
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store / Output / Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Database location. Defaults to `<data dir>/tubelens/tubelens.db`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

/// Where rendered HTML pages are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

/// Log file location. Defaults to `<config dir>/logs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    /// Disable the JSON file layer entirely.
    pub file: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Pipeline behaviour.
///
/// ```toml
/// [pipeline]
/// mode = "similarity"      # or "content"
/// similarity_k = 3
/// max_concurrency = 8
/// distance = "cosine"      # or "l2"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    /// Comments ranked per topic in similarity mode.
    pub similarity_k: usize,
    /// Concurrent branches per fan-out (unbounded when unset).
    pub max_concurrency: Option<usize>,
    /// Per-node visit cap inside each fan-out branch.
    pub branch_max_visits: usize,
    /// Per-node visit cap for the top-level flows.
    pub flow_max_visits: usize,
    /// Distance metric name: `cosine` or `l2`.
    pub distance: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            similarity_k: 3,
            max_concurrency: None,
            branch_max_visits: 5_000_000,
            flow_max_visits: 10_000,
            distance: "cosine".to_string(),
        }
    }
}

/// Which post-processing stage runs after ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Rank comments against each topic and question.
    #[default]
    Similarity,
    /// Rewrite each topic and answer its questions from the transcript.
    Content,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Similarity => "similarity",
            PipelineMode::Content => "content",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "similarity" => Ok(PipelineMode::Similarity),
            "content" => Ok(PipelineMode::Content),
            other => Err(ConfigError::InvalidValue {
                field: "pipeline.mode".to_string(),
                value: other.to_string(),
                expected: "similarity or content".to_string(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = TubelensConfig::from_toml("").unwrap();
        assert_eq!(config, TubelensConfig::default());
        assert_eq!(config.pipeline_or_default().similarity_k, 3);
        assert_eq!(config.embedding_or_default().dimensions, 768);
    }

    #[test]
    fn test_parse_full_config() {
        let config = TubelensConfig::from_toml(
            r#"
[llm]
backend = "gemini"
model = "gemini-2.0-flash"
timeout_secs = 30

[embedding]
batch_size = 50
pacing_ms = 250

[youtube]
max_comment_pages = 4

[store]
path = "/tmp/tubelens.db"

[pipeline]
mode = "content"
similarity_k = 7
max_concurrency = 2
distance = "l2"

[output]
dir = "site"
"#,
        )
        .unwrap();

        let llm = config.llm_or_default();
        assert_eq!(llm.backend, Backend::Gemini);
        assert_eq!(llm.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(llm.timeout_secs, Some(30));

        let embedding = config.embedding_or_default();
        assert_eq!(embedding.batch_size, 50);
        assert_eq!(embedding.pacing_ms, 250);
        assert_eq!(embedding.dimensions, 768);

        let pipeline = config.pipeline_or_default();
        assert_eq!(pipeline.mode, PipelineMode::Content);
        assert_eq!(pipeline.similarity_k, 7);
        assert_eq!(pipeline.max_concurrency, Some(2));
        assert_eq!(pipeline.branch_max_visits, 5_000_000);
        assert_eq!(pipeline.distance, "l2");

        assert_eq!(config.youtube_or_default().max_comment_pages, Some(4));
        assert_eq!(
            config.output.unwrap().dir,
            Some(PathBuf::from("site"))
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = TubelensConfig::from_toml("[pipeline]\nmode = \"summary\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = TubelensConfig::from_toml(
            "[pipeline]\nsimilarity_k = 9\n\n[store]\npath = \"base.db\"\n",
        )
        .unwrap();
        let overlay = TubelensConfig::from_toml("[pipeline]\nmode = \"content\"\n").unwrap();
        base.merge(overlay);

        let pipeline = base.pipeline_or_default();
        assert_eq!(pipeline.mode, PipelineMode::Content);
        assert_eq!(pipeline.similarity_k, 3);
        assert_eq!(base.store.unwrap().path, Some(PathBuf::from("base.db")));
    }

    #[test]
    fn test_toml_roundtrip_skips_missing_sections() {
        let config = TubelensConfig::from_toml("[output]\ndir = \"out\"\n").unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[output]"));
        assert!(!text.contains("[llm]"));
        assert_eq!(TubelensConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Content".parse::<PipelineMode>().unwrap(), PipelineMode::Content);
        assert_eq!(PipelineMode::Similarity.to_string(), "similarity");
        assert!(matches!(
            "other".parse::<PipelineMode>(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
