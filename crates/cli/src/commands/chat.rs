//! The interactive chat loop.

use crate::instructions::INSTRUCTIONS;
use crate::spinner::Spinner;
use anyhow::Context;
use codevet_agent::{Orchestrator, Session, ToolBridge, TurnOutcome};
use codevet_config::{AppConfig, DEFAULT_CONFIG_FILE};
use codevet_review::{Prefilter, Reviewer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;

const WELCOME: &str = "\
codevet — a quality-gated AI coding assistant

Commands:
  /help      show this message
  /context   list files currently in the context
  /usage     show the cache performance report
  /exit      end the conversation

Anything else is sent to the assistant as a question about your project.";

const EXHAUSTED_MESSAGE: &str = "I apologize, but I couldn't generate a \
satisfactory response after several attempts. Please try rephrasing your \
question.";

pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    // Configuration problems are fatal before the first turn.
    let config = AppConfig::load(
        &config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
    )
    .context("failed to load configuration")?;

    let provider = codevet_providers::from_config(&config)?;
    let registry = Arc::new(codevet_tools::builtin_registry(&config.exclude_dirs));
    let workdir = std::env::current_dir().context("cannot determine working directory")?;

    let mut orchestrator = Orchestrator::new(
        provider.clone(),
        ToolBridge::new(registry, workdir),
        Prefilter::new(provider.clone(), config.review_model()),
        Reviewer::new(provider, config.review_model(), config.review_max_tokens),
        config.model.clone(),
        config.max_tokens,
    );
    let mut session = Session::new(INSTRUCTIONS);

    println!("{WELCOME}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break; // stdin closed
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match command {
                "exit" | "quit" => break,
                "help" => println!("{WELCOME}"),
                "context" => println!("{}", session.context.summary()),
                "usage" => println!("{}", orchestrator.meter().report()),
                other => println!("Unknown command: /{other} (try /help)"),
            }
            continue;
        }

        let spinner = Spinner::start("thinking");
        let result = orchestrator.run_turn(&mut session, input).await;
        spinner.stop().await;

        match result {
            Ok(TurnOutcome::Answered(text) | TurnOutcome::Truncated(text)) => {
                println!("\ncodevet> {text}");
                println!("\n{}", orchestrator.meter().report());
            }
            Ok(TurnOutcome::Exhausted) => {
                println!("\ncodevet> {EXHAUSTED_MESSAGE}");
            }
            Err(e) => {
                // Remote-call failures end the turn but not the session.
                error!(error = %e, "turn failed");
                println!("\nSomething went wrong while talking to the model: {e}");
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}
