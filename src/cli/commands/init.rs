//! `bomx init` command - create a project directory

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::credential::{SECRETS_KEY, SECRETS_SECTION};
use crate::core::project::{Project, ProjectError, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Rewrite config even if .bomx/ already exists (secrets are kept)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    match Project::init(&path, args.force) {
        Ok(project) => {
            println!(
                "{} Initialized bomx project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  Add your key under {} in {}",
                style(format!("{}.{}", SECRETS_SECTION, SECRETS_KEY)).yellow(),
                style(project.secrets_path().display()).cyan()
            );
            println!(
                "  {} Extract a BOM from a diagram",
                style("bomx extract diagram.png").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} bomx project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("bomx init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let dir = root.join(PROJECT_DIR);
    println!("  {}/", style(PROJECT_DIR).blue());
    for name in ["config.yaml", "secrets.yaml", ".gitignore"] {
        if dir.join(name).exists() {
            println!("    {}", name);
        }
    }
}
