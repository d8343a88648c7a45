//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning at load time)

use std::fmt;

use crate::{ConfigError, Result};

/// External services that need an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Gemini completions and embeddings.
    Gemini,
    /// YouTube Data API v3.
    Youtube,
    /// Supadata transcript API.
    Supadata,
}

impl Service {
    /// Environment variable holding this service's key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::Gemini => "GEMINI_API_KEY",
            Service::Youtube => "YOUTUBE_API_KEY",
            Service::Supadata => "SUPADATA_API_KEY",
        }
    }

    /// Config section that may carry the key.
    pub fn section(&self) -> &'static str {
        match self {
            Service::Gemini => "llm",
            Service::Youtube => "youtube",
            Service::Supadata => "transcript",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Gemini => "Gemini",
            Service::Youtube => "YouTube",
            Service::Supadata => "Supadata",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Result of API key resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

impl fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve an API key: env var first, then the config file value.
pub fn resolve_api_key(service: Service, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with(service, config_value, |var| std::env::var(var).ok())
}

/// Like [`resolve_api_key`], failing with [`ConfigError::ApiKeyNotFound`].
pub fn require_api_key(service: Service, config_value: Option<&str>) -> Result<ResolvedSecret> {
    resolve_api_key(service, config_value).ok_or_else(|| ConfigError::ApiKeyNotFound {
        service: service.to_string(),
        env_var: service.env_var().to_string(),
        section: service.section().to_string(),
    })
}

fn resolve_with(
    service: Service,
    config_value: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    let env_var = service.env_var();
    if let Some(value) = lookup(env_var)
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_env_var_wins() {
        let resolved = resolve_with(Service::Gemini, Some("from-file"), |var| {
            (var == "GEMINI_API_KEY").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(resolved.value, "from-env");
        assert_eq!(
            resolved.source,
            SecretSource::EnvVar("GEMINI_API_KEY".to_string())
        );
    }

    #[test]
    fn test_empty_env_falls_back_to_config() {
        let resolved =
            resolve_with(Service::Youtube, Some("yt-key"), |_| Some(String::new())).unwrap();
        assert_eq!(resolved.value, "yt-key");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_nothing_available() {
        assert!(resolve_with(Service::Supadata, None, no_env).is_none());
        assert!(resolve_with(Service::Supadata, Some(""), no_env).is_none());
    }

    #[test]
    fn test_missing_key_error_names_env_var() {
        let err = ConfigError::ApiKeyNotFound {
            service: Service::Supadata.to_string(),
            env_var: Service::Supadata.env_var().to_string(),
            section: Service::Supadata.section().to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SUPADATA_API_KEY"));
        assert!(msg.contains("[transcript]"));
    }

    #[test]
    fn test_debug_redacts_value() {
        let secret = ResolvedSecret {
            value: "super-secret".to_string(),
            source: SecretSource::ConfigFile,
        };
        assert!(!format!("{secret:?}").contains("super-secret"));
        assert_eq!(SecretSource::ConfigFile.to_string(), "config file (plaintext)");
    }
}
