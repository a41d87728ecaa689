//! Loanform CLI: submit the loan prediction form from a terminal.
//!
//! Provides a one-shot `submit` mode and a standing `listen` mode.

mod commands;
mod output;

use clap::Parser;
use loanform_core::{ConcurrencyPolicy, LoanformConfig, StylePolicy};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Loanform: post the loan prediction form and show the result
#[derive(Parser, Debug)]
#[command(name = "loanform", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for .loanform/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

/// Where configuration comes from and what the command line overrides.
#[derive(clap::Args, Debug)]
struct SettingsArgs {
    /// Configuration file path (replaces the user and workspace files)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the prediction server, e.g. http://127.0.0.1:5000
    #[arg(short, long)]
    endpoint: Option<String>,

    /// How successful predictions are styled
    #[arg(long, value_enum)]
    style_policy: Option<StyleArg>,

    /// What happens to replies of overlapping submissions
    #[arg(long, value_enum)]
    concurrency: Option<ConcurrencyArg>,
}

impl SettingsArgs {
    /// Load the configuration and apply command-line overrides.
    fn resolve(&self, workspace: &Path) -> anyhow::Result<LoanformConfig> {
        let mut config = match &self.config {
            Some(path) => loanform_core::config::load_config_file(path),
            None => loanform_core::config::load_config(Some(workspace), None),
        }
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

        if let Some(endpoint) = &self.endpoint {
            config.endpoint.base_url = endpoint.clone();
        }
        if let Some(style) = self.style_policy {
            config.render.style_policy = style.into();
        }
        if let Some(concurrency) = self.concurrency {
            config.handler.concurrency = concurrency.into();
        }
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
        Ok(config)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    /// Only "approved" is styled as success
    PredictionLabel,
    /// Every successful reply is styled as success
    Outcome,
}

impl From<StyleArg> for StylePolicy {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::PredictionLabel => StylePolicy::PredictionLabel,
            StyleArg::Outcome => StylePolicy::Outcome,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ConcurrencyArg {
    /// Discard replies older than the newest submission
    LatestWins,
    /// Render every reply as it arrives
    LastResolvedWins,
}

impl From<ConcurrencyArg> for ConcurrencyPolicy {
    fn from(arg: ConcurrencyArg) -> Self {
        match arg {
            ConcurrencyArg::LatestWins => ConcurrencyPolicy::LatestWins,
            ConcurrencyArg::LastResolvedWins => ConcurrencyPolicy::LastResolvedWins,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fill the form and submit it once
    Submit {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Keep the form open: each stdin line of NAME=VALUE pairs edits the form and submits it
    Listen {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Initial form contents.
#[derive(clap::Args, Debug, Default)]
struct FormArgs {
    /// Loan application file (.toml or .json) used to fill the form
    #[arg(short, long)]
    application: Option<PathBuf>,

    /// Text field, repeatable
    #[arg(short = 'f', long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,

    /// File field, repeatable
    #[arg(long = "file", value_name = "NAME=PATH")]
    files: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Initialize a default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "loanform", "loanform")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "loanform.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Configuration is only loaded by the commands that need it, so
    // `config init` works before any configuration exists.
    let settings = cli.settings;
    commands::handle_command(cli.command, &workspace, || settings.resolve(&workspace)).await
}
