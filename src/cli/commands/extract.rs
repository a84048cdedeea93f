//! `bomx extract` command - one-shot extraction from a diagram

use miette::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::commands::utils::{
    can_prompt, connect, formatter_for, print_preview, print_raw_response, prompt_for_key,
    provider_for, report_extraction,
};
use crate::cli::helpers::{find_project, report_written, resolve_format, write_artifact};
use crate::cli::GlobalOpts;
use crate::core::{BomError, Config, ExportKind, Session};

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Diagram image (PNG or JPEG)
    pub image: PathBuf,

    /// Write bom.csv (optionally to this file or directory)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = ".")]
    pub csv: Option<PathBuf>,

    /// Write bom.json (optionally to this file or directory)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = ".")]
    pub json: Option<PathBuf>,

    /// Also print the model's raw reply to stderr
    #[arg(long)]
    pub raw: bool,

    /// Never prompt for an API key
    #[arg(long)]
    pub no_input: bool,
}

pub fn run(args: ExtractArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    let config = Config::load(project.as_ref());
    let mut session = Session::new(provider_for(project.as_ref()));

    // Invalid uploads fail before any key lookup or model call
    let image = session.upload(&args.image)?;
    if !global.quiet {
        print_preview(image);
    }

    if session.credential_source().is_none() && can_prompt(args.no_input) {
        if let Some(key) = prompt_for_key()? {
            session.set_credential(key);
        }
    }

    let extraction = match session.generate(connect(&config, global.quiet)) {
        Ok(extraction) => extraction,
        // The diagnostic only shows a few lines around the failure
        Err(BomError::Parse(e)) => {
            print_raw_response(e.raw_text());
            return Err(BomError::Parse(e).into());
        }
        Err(e) => return Err(e.into()),
    };
    debug!(raw_len = extraction.raw.len(), "Model reply received");
    if args.raw {
        print_raw_response(&extraction.raw);
    }

    let format = resolve_format(global, &config);
    let formatter = formatter_for(&config, global.quiet);
    report_extraction(extraction, &formatter, format);

    let cwd = std::env::current_dir().map_err(|e| BomError::Export(e.to_string()))?;
    for (kind, target) in [(ExportKind::Csv, &args.csv), (ExportKind::Json, &args.json)] {
        let Some(target) = target else { continue };
        // Nothing to write for an empty result
        if let Some(artifact) = extraction.export(kind) {
            let written = write_artifact(artifact, Some(target.as_path()), &cwd)?;
            if !global.quiet {
                report_written(artifact, &written);
            }
        }
    }

    Ok(())
}
