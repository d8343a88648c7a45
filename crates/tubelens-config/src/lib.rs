//! Configuration system for tubelens.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config dir + project-local `tubelens.toml`)
//! - Per-section defaults for embedding batching and pipeline limits
//! - API key resolution (env var, then config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, config_dir, data_dir, load_config,
    load_config_file, load_config_with_options, save_config, user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, Service, require_api_key, resolve_api_key};
pub use types::*;
