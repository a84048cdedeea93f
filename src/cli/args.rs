//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, extract::ExtractArgs, init::InitArgs,
    session::SessionArgs,
};

#[derive(Parser)]
#[command(name = "bomx")]
#[command(author, version, about = "BOM Extractor")]
#[command(long_about = "Upload a product diagram to extract a Bill of Materials using a multimodal model.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .bomx/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a BOM from one diagram image
    Extract(ExtractArgs),

    /// Interactive session: upload, generate, export
    Session(SessionArgs),

    /// Create a .bomx/ directory with config and secrets templates
    Init(InitArgs),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal, CSV when piped
    #[default]
    Auto,
    /// Bordered table
    Table,
    /// Aligned, tab-friendly columns
    Tsv,
    /// CSV export (for spreadsheets)
    Csv,
    /// JSON export (for programming)
    Json,
    /// Markdown table
    Md,
}

impl OutputFormat {
    /// Parse a configured `default_format` value
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}
