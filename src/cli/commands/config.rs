//! `bomx config` command - Configuration management
//!
//! Provides commands to view and modify bomx configuration. API keys live
//! in `secrets.yaml`, never in `config.yaml`.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::find_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path(PathArgs),

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,

    /// Show only project-level config
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global (user) config
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., model, timeout_secs)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Show only project config path
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global config path
    #[arg(long = "global-only")]
    pub global_only: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("model", "Model used for extraction (env: BOMX_MODEL)"),
    ("endpoint", "Generative Language API base URL (env: BOMX_ENDPOINT)"),
    ("timeout_secs", "Request timeout in seconds (env: BOMX_TIMEOUT_SECS)"),
    ("default_format", "Default output format (table, tsv, csv, json, md)"),
    ("wrap_width", "Wrap long table cells at this width"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    match cmd {
        ConfigCommands::Show(args) => run_show(args, project.as_ref()),
        ConfigCommands::Set(args) => run_set(args, project.as_ref()),
        ConfigCommands::Unset(args) => run_unset(args, project.as_ref()),
        ConfigCommands::Path(args) => run_path(args, project.as_ref()),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, project: Option<&Project>) -> Result<()> {
    let config = Config::load(project);

    if let Some(key) = &args.key {
        check_key(key)?;
        println!("{}", get_config_value(&config, key));
        return Ok(());
    }

    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    if args.project_only {
        show_file("Project config:", get_project_config_path(project)?)?;
    } else if args.global_only {
        show_file("Global config:", get_global_config_path()?)?;
    } else {
        println!("{}", style("Effective Configuration").bold().underlined());
        println!();

        for (key, _) in VALID_KEYS {
            print_config_value(key, &get_config_value(&config, key));
        }

        println!();
        println!("{}", style("Config Sources (in priority order):").dim());
        println!("  1. Environment variables (BOMX_MODEL, BOMX_ENDPOINT, BOMX_TIMEOUT_SECS)");
        println!("  2. Project config (.bomx/config.yaml)");
        println!("  3. Global config (~/.config/bomx/config.yaml)");
    }

    Ok(())
}

fn run_set(args: SetArgs, project: Option<&Project>) -> Result<()> {
    check_key(&args.key)?;
    let value = parse_value(&args.key, &args.value)?;

    let config_path = if args.global {
        get_global_config_path()?
    } else {
        get_project_config_path(project)?
    };

    let mut config_map = read_mapping(&config_path)?;
    if let serde_yml::Value::Mapping(map) = &mut config_map {
        map.insert(serde_yml::Value::String(args.key.clone()), value);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, project: Option<&Project>) -> Result<()> {
    let config_path = if args.global {
        get_global_config_path()?
    } else {
        get_project_config_path(project)?
    };

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(&serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };

    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(args: PathArgs, project: Option<&Project>) -> Result<()> {
    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    if args.project_only {
        println!("{}", get_project_config_path(project)?.display());
    } else if args.global_only {
        println!("{}", get_global_config_path()?.display());
    } else {
        let global_path = get_global_config_path()?;

        println!("{}", style("Configuration file paths:").bold());
        println!();
        println!("  {} {}", style("Global:").cyan(), global_path.display());
        print_exists(global_path.exists(), 9);

        println!();
        match project {
            Some(project) => {
                let path = project.config_path();
                println!("  {} {}", style("Project:").cyan(), path.display());
                print_exists(path.exists(), 10);
                println!("  {} {}", style("Secrets:").cyan(), project.secrets_path().display());
                print_exists(project.secrets_path().exists(), 10);
            }
            None => println!(
                "  {} {}",
                style("Project:").cyan(),
                style("(not in a bomx project)").dim()
            ),
        }
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'bomx config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn get_global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn get_project_config_path(project: Option<&Project>) -> Result<PathBuf> {
    project
        .map(Project::config_path)
        .ok_or_else(|| miette::miette!("Not in a bomx project (run 'bomx init' or pass --global)"))
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'bomx config keys' to list valid keys",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

/// Typed YAML value for a key, so the file deserializes back into `Config`
fn parse_value(key: &str, value: &str) -> Result<serde_yml::Value> {
    match key {
        "timeout_secs" | "wrap_width" => {
            let n: u64 = value
                .parse()
                .map_err(|_| miette::miette!("'{}' expects a whole number, got '{}'", key, value))?;
            Ok(serde_yml::Value::Number(n.into()))
        }
        "default_format" => {
            OutputFormat::from_config(value)
                .ok_or_else(|| miette::miette!("Unknown output format '{}'", value))?;
            Ok(serde_yml::Value::String(value.to_lowercase()))
        }
        _ => Ok(serde_yml::Value::String(value.to_string())),
    }
}

fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: serde_yml::Value =
        serde_yml::from_str(&content).unwrap_or(serde_yml::Value::Mapping(Default::default()));
    // Comment-only or empty files parse as null
    if parsed.is_mapping() {
        Ok(parsed)
    } else {
        Ok(serde_yml::Value::Mapping(Default::default()))
    }
}

fn get_config_value(config: &Config, key: &str) -> String {
    match key {
        "model" => config.model().to_string(),
        "endpoint" => config.endpoint().to_string(),
        "timeout_secs" => config.timeout().as_secs().to_string(),
        "default_format" => config
            .default_format
            .clone()
            .unwrap_or_else(|| "auto".to_string()),
        "wrap_width" => config
            .wrap_width
            .map(|w| w.to_string())
            .unwrap_or_else(|| "(not set)".to_string()),
        _ => String::new(),
    }
}

fn print_config_value(key: &str, value: &str) {
    let is_default = match key {
        "model" => value == DEFAULT_MODEL,
        "endpoint" => value == DEFAULT_ENDPOINT,
        "timeout_secs" => value == DEFAULT_TIMEOUT_SECS.to_string(),
        "default_format" => value == "auto",
        _ => value == "(not set)",
    };
    if is_default {
        println!("  {}: {}", style(key).cyan(), style(value).dim());
    } else {
        println!("  {}: {}", style(key).cyan(), style(value).yellow());
    }
}

fn print_exists(exists: bool, indent: usize) {
    let label = if exists {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("{:indent$}{}", "", label, indent = indent);
}

fn show_file(title: &str, path: PathBuf) -> Result<()> {
    println!("{} {}", style(title).bold(), style(path.display()).dim());
    println!();

    if path.exists() {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        print!("{}", content);
    } else {
        println!("{}", style("(not created)").dim());
    }

    Ok(())
}
