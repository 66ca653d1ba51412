//! `relay PROMPT`: run one turn and render it.

use crate::render::Renderer;
use anyhow::Context;
use relay_config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::debug;

pub async fn run(prompt: &str, cwd: PathBuf) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load().context("Failed to load config")?;
    debug!(?config, "Loaded configuration");

    if !config.has_api_key() {
        eprintln!("No API key configured.");
        eprintln!("Set RELAY_API_KEY, OPENROUTER_API_KEY or OPENAI_API_KEY, or add api_key to:");
        eprintln!("  {}", AppConfig::config_dir().join("config.toml").display());
        return Ok(ExitCode::FAILURE);
    }

    let cwd = cwd
        .canonicalize()
        .with_context(|| format!("Working directory {} is not accessible", cwd.display()))?;
    let mut agent = relay_agent::build_agent(&config, cwd).context("Failed to build agent")?;

    let (tx, mut rx) = mpsc::channel(config.agent.event_buffer);
    let turn = async {
        let response = agent.run(prompt, &tx).await;
        drop(tx);
        response
    };
    let render = async {
        let mut renderer = Renderer::new(std::io::stdout(), std::io::stderr());
        while let Some(event) = rx.recv().await {
            renderer.render(&event)?;
        }
        anyhow::Ok(())
    };

    let (response, rendered) = tokio::join!(turn, render);
    rendered.context("Failed to write output")?;

    Ok(match response {
        Some(_) => ExitCode::SUCCESS,
        None => ExitCode::FAILURE,
    })
}
