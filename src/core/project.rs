//! Project discovery and structure
//!
//! A project is any directory containing `.bomx/`. It is optional: without
//! one, only the global config and secrets files are consulted.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::credential::{SECRETS_FILE, SECRETS_KEY, SECRETS_SECTION};

/// Name of the per-project settings directory
pub const PROJECT_DIR: &str = ".bomx";

/// Represents a bomx project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .bomx/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create the `.bomx/` structure at the given path.
    ///
    /// With `force`, existing files are rewritten except `secrets.yaml`,
    /// which is never overwritten.
    pub fn init(path: &Path, force: bool) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let project = Self { root };

        let dir = project.bomx_dir();
        if dir.exists() && !force {
            return Err(ProjectError::AlreadyExists(project.root));
        }

        std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(project.config_path(), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let secrets = project.secrets_path();
        if !secrets.exists() {
            std::fs::write(&secrets, Self::secrets_template())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        std::fs::write(dir.join(".gitignore"), format!("{}\n", SECRETS_FILE))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# bomx project configuration

# Model used for extraction (default: gemini-2.5-flash)
# model: gemini-2.5-flash

# Generative Language API base URL
# endpoint: https://generativelanguage.googleapis.com/v1beta

# Request timeout in seconds (default: 120)
# timeout_secs: 120

# Default output format (auto, table, tsv, csv, json, md)
# default_format: auto

# Wrap long table cells at this width
# wrap_width: 40
"#
    }

    fn secrets_template() -> String {
        format!(
            "# bomx secrets - keep this file out of version control\n\
             {}:\n  # {}: \"your-api-key\"\n",
            SECRETS_SECTION, SECRETS_KEY
        )
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .bomx configuration directory
    pub fn bomx_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.bomx_dir().join("config.yaml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.bomx_dir().join(SECRETS_FILE)
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a bomx project (searched from {searched_from:?}). Run 'bomx init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("bomx project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
