//! tubelens - topic extraction and comment matching for YouTube videos.
//!
//! ```text
//! VideoSource ──► pipeline (tubelens-flow) ──► Renderer ──► <out>/<slug>.html
//!                    │            │
//!               LlmBackend   EmbeddingBatcher
//!                    │            │
//!                    └── Database (tubelens-store) ◄┘
//! ```
//!
//! The binary wires these together from configuration; the library is
//! usable directly with any [`VideoSource`](sources::VideoSource) and LLM
//! backend.

pub mod pipeline;
pub mod render;
pub mod sources;

pub use pipeline::{PipelineOptions, PipelineOutcome, Resources, build_pipeline, run_pipeline};
pub use render::{HtmlRenderer, Renderer, SharedRenderer};
pub use sources::{FixtureSource, SharedSource, SourceError, VideoSource, YoutubeSource};
