//! codevet CLI — the main entry point.
//!
//! One command today: `chat`, the interactive conversation loop, which is
//! also the default when no command is given.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod instructions;
mod spinner;

#[derive(Parser)]
#[command(
    name = "codevet",
    about = "codevet — a quality-gated AI coding assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./codevet.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (default when no command is given)
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(cli.config).await,
    }
}
