//! Streaming chat runner
//!
//! Credential, then client, then one streamed request. Each fragment is
//! written and flushed before the next one is pulled from the network.

use crate::core::client::OllamaClient;
use crate::core::config::{ApiKey, ChatConfig, load_api_key};
use crate::core::constants::chat;
use crate::core::provider::{ChatProvider, ProviderError};
use crate::models::ollama::{ChatMessage, ChatRequest, ChatResponseChunk};
use crate::runner::RunError;
use futures::stream::{Stream, StreamExt};
use std::io::Write;
use tracing::{debug, info};

/// The single user turn sent by the runner
pub fn default_messages() -> Vec<ChatMessage> {
    vec![ChatMessage::user(chat::QUESTION)]
}

/// Authenticated client plus the conversation to send
pub struct ChatSession {
    client: OllamaClient,
    model: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Bind a client to the configured host with the resolved credential
    pub fn new(
        config: &ChatConfig,
        api_key: &ApiKey,
        messages: Vec<ChatMessage>,
    ) -> Result<Self, RunError> {
        let client = OllamaClient::new(config.host.clone(), Some(api_key), config.request_timeout)?;
        Ok(Self {
            client,
            model: config.model.clone(),
            messages,
        })
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Streamed request for this session; messages keep their order
    pub fn request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.model.clone(), self.messages.clone());
        request.stream = true;
        request
    }

    /// Send the conversation and write the reply to `out` as it arrives
    pub async fn stream_to<W: Write>(&self, out: &mut W) -> Result<String, RunError> {
        info!(
            provider = self.client.provider_name(),
            model = %self.model,
            "Sending chat request"
        );
        stream_reply(&self.client, self.request(), out).await
    }
}

/// Dispatch `request` on `provider` and render the streamed reply
///
/// A newline is written once the stream is exhausted.
pub async fn stream_reply<P, W>(
    provider: &P,
    request: ChatRequest,
    out: &mut W,
) -> Result<String, RunError>
where
    P: ChatProvider + ?Sized,
    W: Write,
{
    let stream = provider.chat_stream(request).await?;
    let reply = render_stream(stream, out).await?;
    writeln!(out)?;
    out.flush()?;
    Ok(reply)
}

/// Write each fragment's content as soon as it is pulled, flushing after
/// every write. Returns the concatenated reply.
pub async fn render_stream<S, W>(mut stream: S, out: &mut W) -> Result<String, RunError>
where
    S: Stream<Item = Result<ChatResponseChunk, ProviderError>> + Unpin,
    W: Write,
{
    let mut reply = String::new();
    let mut fragments = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        fragments += 1;

        let content = chunk.content();
        if content.is_empty() {
            continue;
        }
        out.write_all(content.as_bytes())?;
        out.flush()?;
        reply.push_str(content);
    }

    debug!(fragments, chars = reply.chars().count(), "Stream finished");
    Ok(reply)
}

/// Load the credential from the env file, connect, and stream the reply
///
/// A missing credential fails here, before any client exists.
pub async fn run<W: Write>(config: &ChatConfig, out: &mut W) -> Result<String, RunError> {
    let api_key = load_api_key(&config.env_file)?;
    let session = ChatSession::new(config, &api_key, default_messages())?;
    session.stream_to(out).await
}
