//! Chat client and provider transports for relay.
//!
//! [`ChatClient`] drives one completion at a time over any
//! `relay_core::ChatTransport`, applying retry/backoff and decoding the
//! response into `StreamEvent`s. [`OpenAiCompatTransport`] is the HTTP
//! transport for OpenAI-compatible endpoints.

pub mod client;
pub mod decode;
pub mod openai_compat;
pub mod retry;

pub use client::ChatClient;
pub use decode::StreamDecoder;
pub use openai_compat::OpenAiCompatTransport;
pub use retry::RetryPolicy;
