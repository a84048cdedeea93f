//! `bomx session` command - interactive upload/generate/export loop
//!
//! Every action is handled to completion before the menu comes back. Errors
//! are rendered and the loop continues; only I/O failures on the terminal
//! itself end the session.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::{
    connect, formatter_for, print_preview, print_raw_response, prompt_for_key, provider_for,
    report_extraction,
};
use crate::cli::helpers::{find_project, report_written, resolve_format, write_artifact};
use crate::cli::table::TableFormatter;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::credential::API_KEY_URL;
use crate::core::{Config, ExportKind, Session, ViewState};

#[derive(clap::Args, Debug)]
pub struct SessionArgs {
    /// Image to upload when the session starts
    pub image: Option<PathBuf>,

    /// Directory exports are written to (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Upload,
    Generate,
    ShowTable,
    ExportCsv,
    ExportJson,
    SetKey,
    ClearKey,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Upload => "Upload image",
            Action::Generate => "Generate BOM",
            Action::ShowTable => "Show table",
            Action::ExportCsv => "Download CSV",
            Action::ExportJson => "Download JSON",
            Action::SetKey => "Save API key for this session",
            Action::ClearKey => "Clear session API key",
            Action::Quit => "Quit",
        }
    }
}

/// Menu entries valid for the current state
fn available_actions(session: &Session) -> Vec<Action> {
    let mut actions = vec![Action::Upload];
    if session.image().is_some() {
        actions.push(Action::Generate);
    }
    if session.state() == ViewState::Success {
        actions.extend([Action::ShowTable, Action::ExportCsv, Action::ExportJson]);
    }
    if session.has_session_credential() {
        actions.push(Action::ClearKey);
    } else {
        actions.push(Action::SetKey);
    }
    actions.push(Action::Quit);
    actions
}

pub fn run(args: SessionArgs, global: &GlobalOpts) -> Result<()> {
    if !console::user_attended() {
        return Err(miette::miette!(
            help = "Use 'bomx extract <IMAGE>' for non-interactive runs",
            "The session command needs an interactive terminal"
        ));
    }

    let project = find_project(global);
    let config = Config::load(project.as_ref());
    let mut session = Session::new(provider_for(project.as_ref()));
    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => std::env::current_dir().into_diagnostic()?,
    };

    // Terminal output in the session; CSV/JSON go to files
    let format = match resolve_format(global, &config) {
        OutputFormat::Csv | OutputFormat::Json | OutputFormat::Auto => OutputFormat::Table,
        other => other,
    };
    let formatter = formatter_for(&config, global.quiet);
    let theme = ColorfulTheme::default();

    println!("{}", style("BOM Extractor").bold());
    println!(
        "{}",
        style("Upload a product diagram to extract a Bill of Materials.").dim()
    );
    println!();

    if let Some(path) = &args.image {
        upload(&mut session, path);
    }

    loop {
        print_status(&session);
        let actions = available_actions(&session);
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let default = actions
            .iter()
            .position(|a| *a == Action::Generate && session.state() == ViewState::Preview)
            .unwrap_or(0);

        let choice = Select::with_theme(&theme)
            .with_prompt("What next?")
            .items(&labels)
            .default(default)
            .interact()
            .into_diagnostic()?;

        match actions[choice] {
            Action::Upload => {
                let path: String = Input::with_theme(&theme)
                    .with_prompt("Image path (png, jpg, jpeg)")
                    .interact_text()
                    .into_diagnostic()?;
                upload(&mut session, &PathBuf::from(path.trim()));
            }
            Action::Generate => generate(&mut session, &config, &formatter, format, global.quiet)?,
            Action::ShowTable => {
                if let Some(extraction) = session.extraction() {
                    formatter.output(extraction, format);
                }
            }
            Action::ExportCsv => export(&session, ExportKind::Csv, &out_dir),
            Action::ExportJson => export(&session, ExportKind::Json, &out_dir),
            Action::SetKey => {
                eprintln!(
                    "{} Get a key at {}",
                    style("i").blue(),
                    style(API_KEY_URL).cyan().underlined()
                );
                let key: String = Password::with_theme(&theme)
                    .with_prompt("Enter your Google API Key")
                    .allow_empty_password(true)
                    .interact()
                    .into_diagnostic()?;
                if session.set_credential(key) {
                    eprintln!("{} API key saved for this session", style("✓").green());
                } else {
                    eprintln!("{} Empty key ignored", style("!").yellow());
                }
            }
            Action::ClearKey => {
                session.clear_credential();
                eprintln!("{} Session API key cleared", style("✓").green());
            }
            Action::Quit => break,
        }
        println!();
    }

    Ok(())
}

fn print_status(session: &Session) {
    let key = match session.credential_source() {
        Some(source) => style(format!("API key: {}", source)).green(),
        None => style("API key: not set".to_string()).yellow(),
    };
    let image = match session.image() {
        Some(image) => style(image.caption()).cyan(),
        None => style("No image uploaded".to_string()).dim(),
    };
    eprintln!("{}  {}", image, key);
}

fn upload(session: &mut Session, path: &std::path::Path) {
    match session.upload(path) {
        Ok(image) => print_preview(image),
        Err(e) => render_error(e),
    }
}

fn generate(
    session: &mut Session,
    config: &Config,
    formatter: &TableFormatter,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    if session.credential_source().is_none() {
        if let Some(key) = prompt_for_key()? {
            session.set_credential(key);
        }
    }

    match session.generate(connect(config, quiet)) {
        Ok(extraction) => report_extraction(extraction, formatter, format),
        Err(crate::core::BomError::Parse(e)) => {
            print_raw_response(e.raw_text());
            render_error(e.into());
        }
        Err(e) => render_error(e),
    }
    Ok(())
}

fn export(session: &Session, kind: ExportKind, out_dir: &std::path::Path) {
    let Some(artifact) = session.export(kind) else {
        eprintln!("{} Nothing to export yet", style("!").yellow());
        return;
    };
    match write_artifact(artifact, None, out_dir) {
        Ok(path) => report_written(artifact, &path),
        Err(e) => eprintln!("{:?}", e),
    }
}

/// Show an action's error with full diagnostics and keep going
fn render_error(error: crate::core::BomError) {
    eprintln!("{:?}", miette::Report::new(error));
}
