//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, ExportArtifact, Project};

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Find the project from `--project` or by walking up from the cwd.
///
/// Projects are optional, so a missing `.bomx/` is not an error.
pub fn find_project(global: &GlobalOpts) -> Option<Project> {
    let found = match &global.project {
        Some(root) => Project::discover_from(root),
        None => Project::discover(),
    };
    match found {
        Ok(project) => {
            debug!("Using project at {}", project.root().display());
            Some(project)
        }
        Err(e) => {
            debug!("No project: {}", e);
            None
        }
    }
}

/// Pick the concrete output format for a result table
pub fn resolve_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    let requested = match global.format {
        OutputFormat::Auto => config
            .default_format
            .as_deref()
            .and_then(OutputFormat::from_config)
            .unwrap_or(OutputFormat::Auto),
        other => other,
    };

    match requested {
        OutputFormat::Auto if console::Term::stdout().is_term() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Csv,
        other => other,
    }
}

/// Write an export to `path`, or to its default file name in `dir`
pub fn write_artifact(artifact: &ExportArtifact, path: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    let target = match path {
        Some(p) if p.is_dir() => p.join(artifact.file_name),
        Some(p) => p.to_path_buf(),
        None => dir.join(artifact.file_name),
    };
    std::fs::write(&target, &artifact.data).into_diagnostic()?;
    Ok(target)
}

/// Print a success line for a written export
pub fn report_written(artifact: &ExportArtifact, path: &Path) {
    eprintln!(
        "{} Saved {} ({}) to {}",
        style("✓").green(),
        style(artifact.file_name).cyan(),
        artifact.mime,
        style(path.display()).cyan()
    );
}
