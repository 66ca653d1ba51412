//! Wiring an [`Agent`] from application configuration.

use crate::agent::Agent;
use relay_config::AppConfig;
use relay_core::error::ProviderError;
use relay_core::registry::ToolRegistry;
use relay_providers::{ChatClient, OpenAiCompatTransport, RetryPolicy};
use relay_tools::ReadFileTool;
use std::path::PathBuf;
use std::sync::Arc;

/// Build the registry of built-in tools using the configured limits.
pub fn build_registry(config: &AppConfig) -> ToolRegistry {
    let limits = &config.tools.read_file;
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ReadFileTool::with_limits(
        limits.max_file_size_bytes,
        limits.max_output_tokens,
    )));
    registry
}

/// Build a chat client over the configured OpenAI-compatible endpoint.
pub fn build_client(config: &AppConfig) -> Result<ChatClient, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "No API key found. Set RELAY_API_KEY or OPENROUTER_API_KEY, or add api_key to ~/.relay/config.toml".into(),
        )
    })?;

    let transport = OpenAiCompatTransport::new(
        "openai_compat",
        config.base_url.clone(),
        api_key,
        config.request_timeout(),
    )?;

    Ok(ChatClient::new(Arc::new(transport), config.model.clone())
        .with_retry(RetryPolicy::new(
            config.retry.max_retries,
            config.retry.backoff_base(),
        ))
        .with_buffer(config.agent.event_buffer))
}

/// Build a ready-to-run agent rooted at `cwd`.
pub fn build_agent(config: &AppConfig, cwd: impl Into<PathBuf>) -> Result<Agent, ProviderError> {
    let mut agent = Agent::new(build_client(config)?, build_registry(config), cwd);
    if let Some(prompt) = &config.agent.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }
    Ok(agent)
}
