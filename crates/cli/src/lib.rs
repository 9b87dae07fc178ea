pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stockroom_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

use crate::commands::catalog::CatalogCommand;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "stockroom",
    about = "Stockroom operator CLI",
    long_about = "Inspect and change the product catalog stored in the configured JSON data file.",
    after_help = "Examples:\n  stockroom list\n  stockroom create '{\"sku\":\"A1\",...}'\n  stockroom deduct <id> 2\n  stockroom config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a stockroom.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the storage data directory")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List every product in insertion order")]
    List,
    #[command(about = "Show one product by id")]
    Get { id: String },
    #[command(about = "Create a product from JSON (inline or @file)")]
    Create { input: String },
    #[command(about = "Replace every mutable field of a product from JSON")]
    Update { id: String, input: String },
    #[command(about = "Change only the fields present in the JSON")]
    Patch { id: String, input: String },
    #[command(about = "Delete a product and print it")]
    Remove { id: String },
    #[command(about = "Take units out of stock")]
    Deduct {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    #[command(about = "Put units back into stock")]
    Restore {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            other => other.to_catalog().map(|command| command.name()).unwrap_or("unknown"),
        }
    }

    fn to_catalog(&self) -> Option<CatalogCommand> {
        let command = match self {
            Self::List => CatalogCommand::List,
            Self::Get { id } => CatalogCommand::Get { id: id.clone() },
            Self::Create { input } => CatalogCommand::Create { input: input.clone() },
            Self::Update { id, input } => {
                CatalogCommand::Update { id: id.clone(), input: input.clone() }
            }
            Self::Patch { id, input } => {
                CatalogCommand::Patch { id: id.clone(), input: input.clone() }
            }
            Self::Remove { id } => CatalogCommand::Remove { id: id.clone() },
            Self::Deduct { id, quantity } => {
                CatalogCommand::Deduct { id: id.clone(), quantity: *quantity }
            }
            Self::Restore { id, quantity } => {
                CatalogCommand::Restore { id: id.clone(), quantity: *quantity }
            }
            Self::Config => return None,
        };
        Some(command)
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(cli: Cli) -> CommandResult {
    let name = cli.command.name();
    let overrides = ConfigOverrides { data_dir: cli.data_dir, ..ConfigOverrides::default() };
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config.clone(),
        overrides: overrides.clone(),
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(name, error),
    };
    init_logging(&config);

    match cli.command.to_catalog() {
        Some(command) => commands::catalog::run(&config, command),
        None => commands::config::run(&config, cli.config.as_deref(), &overrides),
    }
}

/// Installs the global subscriber on stderr so stdout stays one JSON object.
/// `RUST_LOG` takes over from `logging.level` when it parses.
pub fn init_logging(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(build_env_filter(config))
        .with_writer(std::io::stderr);

    // a subscriber may already be installed when commands run in-process
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn build_env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(config)))
}

fn default_log_directive(config: &AppConfig) -> String {
    config.logging.level.trim().to_ascii_lowercase()
}
