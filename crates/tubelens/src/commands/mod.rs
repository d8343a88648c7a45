//! CLI command handlers.

pub mod config;
pub mod matches;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tubelens_config::TubelensConfig;
use tubelens_store::Database;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: TubelensConfig,
    /// Config files that were loaded, lowest precedence first.
    pub sources: Vec<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Database path from `--db`, else the configured store path.
    pub fn store_path(&self, flag: Option<&Path>) -> Result<PathBuf> {
        match flag {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(self.config.store_path()?),
        }
    }

    /// Open (creating if needed) the store at `path`.
    pub fn open_store(&self, path: &Path) -> Result<Arc<Database>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let dimensions = self.config.embedding_or_default().dimensions;
        let store = Database::open(path, dimensions)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Arc::new(store))
    }
}
