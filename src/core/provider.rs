//! Provider abstraction layer
//!
//! The two narrow call contracts the runners depend on: a chat/embedding
//! provider, and an extraction service that answers a prompt from a source
//! document.

use crate::models::graph::ExtractionRequest;
use crate::models::ollama::{ChatRequest, ChatResponseChunk};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Lazy, finite, single-pass sequence of chat fragments
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatResponseChunk, ProviderError>> + Send>>;

/// Trait for chat and embedding backends
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat request and wait for the whole reply
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponseChunk, ProviderError>;

    /// Send a chat request and return the reply as a stream of fragments
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, ProviderError>;

    /// Embed each input; vectors come back in input order
    async fn embed(
        &self,
        model: &str,
        inputs: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Turns a prompt plus a source document into a structured answer
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn run(&self, request: &ExtractionRequest) -> Result<serde_json::Value, ProviderError>;

    fn service_name(&self) -> &str;
}
