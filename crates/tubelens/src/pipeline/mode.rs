//! Routes the pre-processed video to the selected post-processing stage.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;
use tubelens_config::PipelineMode;
use tubelens_flow::{Action, Memory, Node};

use super::{MODE_KEY, Resources};

pub const SIMILARITY: Action = Action::new("similarity");
pub const CONTENT: Action = Action::new("content");

/// Emits [`SIMILARITY`] or [`CONTENT`] according to the `mode` global.
pub struct ChooseMode;

#[async_trait]
impl Node<Resources> for ChooseMode {
    type Prep = PipelineMode;
    type Exec = ();

    fn name(&self) -> &str {
        "choose_mode"
    }

    fn actions(&self) -> Vec<Action> {
        vec![SIMILARITY, CONTENT]
    }

    async fn prepare(&self, memory: &mut Memory<Resources>) -> anyhow::Result<PipelineMode> {
        let mode: Option<String> = memory.get(MODE_KEY)?;
        match mode {
            Some(mode) => mode
                .parse()
                .with_context(|| format!("unsupported pipeline mode '{mode}'")),
            None => Ok(PipelineMode::default()),
        }
    }

    async fn execute(&self, _mode: &PipelineMode) -> anyhow::Result<()> {
        Ok(())
    }

    async fn finalize(
        &self,
        _memory: &mut Memory<Resources>,
        mode: PipelineMode,
        _exec: (),
    ) -> anyhow::Result<Action> {
        info!(mode = %mode, "Selected post-processing stage");
        Ok(match mode {
            PipelineMode::Similarity => SIMILARITY,
            PipelineMode::Content => CONTENT,
        })
    }
}
