//! relay CLI: the main entry point.
//!
//! `relay [PROMPT]` runs one agent turn against the configured model and
//! streams the reply to stdout. Tool activity and errors go to stderr.

use clap::Parser;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod render;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "relay: a streaming coding agent for one turn at a time",
    version
)]
struct Cli {
    /// Message to send. Read from stdin when omitted and stdin is piped.
    prompt: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Working directory tools resolve relative paths against
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let prompt = match cli.prompt {
        Some(prompt) => prompt,
        None if !std::io::stdin().is_terminal() => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        None => {
            eprintln!("Interactive mode is not available. Pass a PROMPT argument or pipe one on stdin.");
            return Ok(ExitCode::from(2));
        }
    };

    let prompt = prompt.trim();
    if prompt.is_empty() {
        eprintln!("Prompt is empty.");
        return Ok(ExitCode::from(2));
    }

    let cwd = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    commands::agent::run(prompt, cwd).await
}
