//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/tubelens/config.toml` (or `$TUBELENS_CONFIG_DIR/config.toml`)
//! 2. `./tubelens.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TubelensConfig};

/// Default config filename for project-local config.
pub const PROJECT_CONFIG_FILE: &str = "tubelens.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for directory resolution.
const APP_NAME: &str = "tubelens";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "TUBELENS_CONFIG_DIR";

/// Database filename inside the data directory.
const DATABASE_FILE: &str = "tubelens.db";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: TubelensConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (unreadable layers, plaintext keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `TUBELENS_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = TubelensConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    check_plaintext_keys(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<TubelensConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TubelensConfig::from_toml(&contents)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config(config: &TubelensConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Directories
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory: `TUBELENS_CONFIG_DIR`, else the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Platform data directory for tubelens.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

impl TubelensConfig {
    /// Database path: `[store].path`, else `<data dir>/tubelens.db`.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = self.store.as_ref().and_then(|s| s.path.clone()) {
            return Ok(path);
        }
        data_dir()
            .map(|d| d.join(DATABASE_FILE))
            .ok_or(ConfigError::NoDirectory("data"))
    }

    /// Log directory: `[logging].dir`, else `<config dir>/logs`.
    pub fn log_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.logging.as_ref().and_then(|l| l.dir.clone()) {
            return Ok(dir);
        }
        config_dir()
            .map(|d| d.join("logs"))
            .ok_or(ConfigError::NoDirectory("config"))
    }

    /// HTML output directory: `[output].dir`, else `./output`.
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .as_ref()
            .and_then(|o| o.dir.clone())
            .unwrap_or_else(|| PathBuf::from("output"))
    }
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(
    config: &mut TubelensConfig,
    path: &Path,
    warnings: &mut Vec<String>,
) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

/// Warn about API keys stored directly in config files.
fn check_plaintext_keys(config: &TubelensConfig, warnings: &mut Vec<String>) {
    let sections = [
        (
            "llm",
            "GEMINI_API_KEY",
            config.llm.as_ref().is_some_and(|c| c.has_plaintext_api_key()),
        ),
        (
            "youtube",
            "YOUTUBE_API_KEY",
            config
                .youtube
                .as_ref()
                .is_some_and(|c| c.has_plaintext_api_key()),
        ),
        (
            "transcript",
            "SUPADATA_API_KEY",
            config
                .transcript
                .as_ref()
                .is_some_and(|c| c.has_plaintext_api_key()),
        ),
    ];

    for (section, env_var, plaintext) in sections {
        if plaintext {
            warnings.push(format!(
                "[{}] contains a plaintext API key. Consider setting {} instead.",
                section, env_var
            ));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
