//! Error types for the relay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; nothing below the agent
//! boundary lets these escape as panics. They are converted to
//! [`StreamEvent::Error`](crate::event::StreamEvent) or an error
//! [`ToolResult`](crate::tool::ToolResult) first.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Rate limits and connection-level failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Network(_) | Self::StreamInterrupted(_) | Self::Timeout(_)
        )
    }

    /// Short label used when reporting a failure after retries ran out.
    pub fn retry_label(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "Rate limit exceeded",
            _ => "API connection error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
