//! judgekit CLI: run LLM-as-a-judge evaluations from YAML configs.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// judgekit: score candidate model configurations with a judge model
#[derive(Parser, Debug)]
#[command(name = "judgekit", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (for `.judgekit/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run an evaluation from a YAML config
    RunEval {
        /// Path to the evaluation config (.yaml or .yml)
        config_path: PathBuf,

        /// Report path (default: <report dir>/<config stem>_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prompt variable, repeatable: --var city=Lisbon
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = commands::parse_var)]
        vars: Vec<(String, String)>,

        /// Maximum judge calls in flight
        #[arg(long)]
        judge_concurrency: Option<usize>,

        /// Fail on missing prompt variables instead of asking for them
        #[arg(long)]
        no_input: bool,
    },
    /// Load and validate a config without calling any model
    Validate {
        /// Path to the evaluation config (.yaml or .yml)
        config_path: PathBuf,
    },
    /// Manage judgekit settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default settings file
    Init,
    /// Show the effective settings
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = judgekit_core::config::log_dir().unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "judgekit.log");
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

    // Ctrl-C cancels the run between (or during) stages.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling evaluation");
            interrupt.cancel();
        }
    });

    match commands::handle_command(cli.command, &workspace, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::print_error_message(&commands::error_message(&e));
            ExitCode::FAILURE
        }
    }
}
