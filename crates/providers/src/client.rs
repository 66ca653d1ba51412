//! The streaming chat client.
//!
//! [`ChatClient::chat_completion`] spawns a producer task that runs the
//! request-and-stream cycle (with retry/backoff) and writes typed
//! [`StreamEvent`]s into a bounded channel. The task never fails: every
//! error ends the sequence as a single `StreamEvent::Error`.
//!
//! Events already delivered from an attempt that later fails are not
//! rolled back, so a retry after partial streaming can repeat text.

use relay_core::error::ProviderError;
use relay_core::event::StreamEvent;
use relay_core::message::WireMessage;
use relay_core::provider::{ChatRequest, ChatTransport, ToolDefinition};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::decode::{StreamDecoder, decode_completion};
use crate::retry::RetryPolicy;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Owns the transport and the retry policy for one model.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    model: String,
    retry: RetryPolicy,
    buffer: usize,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
            retry: RetryPolicy::default(),
            buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the event channel capacity (minimum 1).
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a completion and return the receiving end of its event sequence.
    ///
    /// The sequence is finite and not restartable. Dropping the receiver
    /// stops the producer, including while it waits out a backoff.
    pub fn chat_completion(
        &self,
        messages: Vec<WireMessage>,
        tools: Option<Vec<ToolDefinition>>,
        stream: bool,
    ) -> mpsc::Receiver<StreamEvent> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            tools,
            stream,
        };
        let (tx, rx) = mpsc::channel(self.buffer);
        let transport = Arc::clone(&self.transport);
        let retry = self.retry;

        tokio::spawn(async move {
            produce(transport.as_ref(), &request, retry, &tx).await;
        });

        rx
    }
}

/// Why a single attempt ended early.
enum AttemptError {
    Provider(ProviderError),
    ReceiverGone,
}

impl From<ProviderError> for AttemptError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

async fn produce(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    retry: RetryPolicy,
    tx: &mpsc::Sender<StreamEvent>,
) {
    let mut attempt = 0u32;

    loop {
        debug!(
            transport = %transport.name(),
            model = %request.model,
            attempt,
            stream = request.stream,
            "Sending chat completion request"
        );

        let outcome = if request.stream {
            stream_once(transport, request, tx).await
        } else {
            complete_once(transport, request, tx).await
        };

        let err = match outcome {
            Ok(()) => return,
            Err(AttemptError::ReceiverGone) => {
                debug!("Event receiver dropped, abandoning request");
                return;
            }
            Err(AttemptError::Provider(e)) => e,
        };

        if !err.is_transient() {
            error!(error = %err, "Chat completion failed");
            let _ = tx.send(StreamEvent::error(format!("API error: {err}"))).await;
            return;
        }

        if !retry.should_retry(attempt, &err) {
            error!(error = %err, retries = retry.max_retries, "Chat completion failed after retries");
            let _ = tx
                .send(StreamEvent::error(format!(
                    "{} after {} retries: {err}",
                    err.retry_label(),
                    retry.max_retries
                )))
                .await;
            return;
        }

        let wait = retry.delay_for(attempt);
        warn!(
            error = %err,
            attempt,
            wait_ms = wait.as_millis() as u64,
            "Transient provider failure, backing off"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tx.closed() => {
                debug!("Event receiver dropped during backoff");
                return;
            }
        }

        attempt += 1;
        info!(attempt, "Retrying chat completion");
    }
}

async fn stream_once(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), AttemptError> {
    let mut chunks = transport.stream(request).await?;
    let mut decoder = StreamDecoder::new();

    while let Some(item) = chunks.recv().await {
        if let Some(event) = decoder.push(item?) {
            send(tx, event).await?;
        }
    }

    for event in decoder.finish() {
        send(tx, event).await?;
    }
    Ok(())
}

async fn complete_once(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), AttemptError> {
    let completion = transport.complete(request).await?;
    for event in decode_completion(completion)? {
        send(tx, event).await?;
    }
    Ok(())
}

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), AttemptError> {
    tx.send(event).await.map_err(|_| AttemptError::ReceiverGone)
}
