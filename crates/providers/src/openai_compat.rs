//! OpenAI-compatible HTTP transport.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, and any endpoint exposing
//! `/chat/completions` with server-sent-event streaming.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use relay_core::error::ProviderError;
use relay_core::provider::{ChatChunk, ChatCompletion, ChatRequest, ChatTransport, ChunkReceiver};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound on establishing the TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// An OpenAI-compatible chat endpoint reached over HTTP(S).
pub struct OpenAiCompatTransport {
    name: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatTransport {
    /// Create a new transport.
    ///
    /// `timeout` bounds the gap between reads on a stream, and the whole
    /// exchange for a non-streaming completion. A stream that keeps
    /// producing data may run longer than `timeout` in total.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .read_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client,
        })
    }

    /// Create an OpenRouter transport (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if request.stream {
            builder = builder.header("Accept", "text/event-stream");
        } else {
            builder = builder.timeout(self.timeout);
        }

        let response = builder
            .json(&request.to_body())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(provider = %self.name, status, body = %body, "Provider returned error");
        Err(status_error(status, body))
    }
}

#[async_trait]
impl ChatTransport for OpenAiCompatTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver, ProviderError> {
        let response = self.post(request).await?;

        let (tx, rx) = mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            read_sse(response.bytes_stream(), tx, &provider_name).await;
        });

        Ok(rx)
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let response = self.post(request).await?;
        response
            .json::<ChatCompletion>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}

/// Split a byte stream into SSE lines and forward the parsed chunks.
///
/// Lines are cut on raw `\n` bytes before decoding, so a multi-byte
/// character split across network reads is reassembled intact.
async fn read_sse<S, B, E>(
    byte_stream: S,
    tx: mpsc::Sender<Result<ChatChunk, ProviderError>>,
    provider_name: &str,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk_result) = byte_stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                    .await;
                return;
            }
        };
        buffer.extend_from_slice(bytes.as_ref());

        while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            match parse_sse_line(&line) {
                SseLine::Skip => {}
                SseLine::Done => return,
                SseLine::Chunk(chunk) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                }
                SseLine::Failure(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
                SseLine::Unparseable(data, e) => {
                    trace!(
                        provider = %provider_name,
                        data = %data,
                        error = %e,
                        "Ignoring unparseable SSE chunk"
                    );
                }
            }
        }
    }

    debug!(provider = %provider_name, "SSE stream ended without [DONE]");
}

/// Classification of one SSE line.
#[derive(Debug)]
enum SseLine {
    Skip,
    Done,
    Chunk(ChatChunk),
    Failure(ProviderError),
    Unparseable(String, String),
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches(['\r', '\n']);

    // Skip empty lines, SSE comments, and non-data fields
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();

    if data.is_empty() {
        return SseLine::Skip;
    }
    if data == "[DONE]" {
        return SseLine::Done;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return SseLine::Unparseable(data.to_string(), e.to_string()),
    };

    // Some gateways report upstream failures in-band
    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        let code = err.get("code").and_then(|c| c.as_u64()).unwrap_or(500) as u16;
        return SseLine::Failure(status_error(code, message));
    }

    match serde_json::from_value::<ChatChunk>(value) {
        Ok(chunk) => SseLine::Chunk(chunk),
        Err(e) => SseLine::Unparseable(data.to_string(), e.to_string()),
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited(body),
        401 | 403 => ProviderError::AuthenticationFailed(if body.is_empty() {
            "Invalid API key or insufficient permissions".into()
        } else {
            body
        }),
        404 => ProviderError::ModelNotFound(body),
        408 => ProviderError::Timeout(body),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}
