//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::core::credential::SECRETS_FILE;
use crate::core::Project;

/// Default Gemini REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// bomx configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier used for extraction
    pub model: Option<String>,

    /// Base URL of the generative language API
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Default output format
    pub default_format: Option<String>,

    /// Wrap long table cells at this width
    pub wrap_width: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (applied by the accessors)

        // 2. Global user config (~/.config/bomx/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.bomx/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(model) = std::env::var("BOMX_MODEL") {
            config.model = Some(model);
        }
        if let Ok(endpoint) = std::env::var("BOMX_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }
        if let Ok(timeout) = std::env::var("BOMX_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => config.timeout_secs = Some(secs),
                Err(_) => warn!("Ignoring invalid BOMX_TIMEOUT_SECS value '{}'", timeout),
            }
        }

        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Option<Config>>(&contents) {
            // An empty file parses as null
            Ok(parsed) => Some(parsed.unwrap_or_default()),
            Err(e) => {
                warn!("Ignoring invalid config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Directory holding the global config and secrets files
    pub fn global_config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bomx").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.yaml"))
    }

    /// Secrets files in lookup order: project first, then global
    pub fn secrets_paths(project: Option<&Project>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(project) = project {
            paths.push(project.secrets_path());
        }
        if let Some(dir) = Self::global_config_dir() {
            paths.push(dir.join(SECRETS_FILE));
        }
        paths
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.wrap_width.is_some() {
            self.wrap_width = other.wrap_width;
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let config = Config {
            endpoint: Some("http://localhost:8080/v1beta/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:8080/v1beta");
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            model: Some("base-model".to_string()),
            timeout_secs: Some(10),
            ..Default::default()
        };
        base.merge(Config {
            model: Some("override".to_string()),
            ..Default::default()
        });
        assert_eq!(base.model(), "override");
        assert_eq!(base.timeout_secs, Some(10));
    }

    #[test]
    fn test_read_file_handles_empty_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        std::fs::write(&path, "").unwrap();
        assert!(Config::read_file(&path).is_some());

        std::fs::write(&path, "model: gemini-2.0-flash\ntimeout_secs: 30\n").unwrap();
        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.timeout(), Duration::from_secs(30));

        std::fs::write(&path, "timeout_secs: soon\n").unwrap();
        assert!(Config::read_file(&path).is_none());
    }
}
