//! Ollama HTTP client
//!
//! Talks to a local or hosted Ollama server. Hosted access is authenticated
//! with a bearer credential bound into the client's default headers at
//! construction time.

use crate::core::config::ApiKey;
use crate::core::constants::endpoint;
use crate::core::provider::{ChatProvider, ChunkStream, ProviderError};
use crate::models::ollama::{ChatRequest, ChatResponseChunk, EmbedRequest, EmbedResponse, ErrorBody};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::Stream;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Ollama client (local server or ollama.com)
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Server root, e.g. `http://localhost:11434`
    /// * `api_key` - Bearer credential; `None` for an unauthenticated local server
    /// * `timeout` - Optional request timeout in seconds
    pub fn new(
        base_url: Url,
        api_key: Option<&ApiKey>,
        timeout: Option<u64>,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let authorization = match api_key {
            Some(key) => {
                let mut value = HeaderValue::from_str(&key.bearer()).map_err(|_| {
                    ProviderError::Authentication(
                        "OLLAMA_API_KEY contains characters not allowed in a header".to_string(),
                    )
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value.clone());
                Some(value)
            }
            None => None,
        };

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            authorization,
        })
    }

    /// `Authorization` header sent with every request, if any
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_ref().and_then(|v| v.to_str().ok())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Classify Ollama errors and provide helpful messages
    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("unauthorized") || error_lower.contains("invalid api key") {
            return "Invalid API key. Please check OLLAMA_API_KEY in your .env file.".to_string();
        }

        if error_lower.contains("model")
            && (error_lower.contains("not found") || error_lower.contains("does not exist"))
        {
            return format!(
                "{} (pull it first with `ollama pull <model>`)",
                error_detail.trim()
            );
        }

        if error_lower.contains("rate limit") || error_lower.contains("too many requests") {
            return "Rate limit exceeded. Please wait and try again.".to_string();
        }

        error_detail.to_string()
    }

    fn status_error(status: StatusCode, body: &str) -> ProviderError {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.to_string());
        let message = Self::classify_error(&detail);

        match status.as_u16() {
            401 | 403 => ProviderError::Authentication(message),
            404 => ProviderError::ModelNotFound(message),
            429 => ProviderError::RateLimit(message),
            400 => ProviderError::BadRequest(message),
            code => ProviderError::Api {
                status: code,
                message,
            },
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() {
            ProviderError::Transport(format!(
                "Cannot reach Ollama at {} (is the server running?): {}",
                self.base_url, e
            ))
        } else {
            ProviderError::Transport(e.to_string())
        }
    }

    /// POST a JSON body, mapping non-2xx statuses to errors
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Ollama returned {} for {}: {}", status, url, error_text);
            return Err(Self::status_error(status, &error_text));
        }

        Ok(response)
    }
}

/// Decode one NDJSON line; blank lines yield `None`
pub fn decode_chunk_line(line: &str) -> Result<Option<ChatResponseChunk>, ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: ChatResponseChunk = serde_json::from_str(line)
        .map_err(|e| ProviderError::InvalidResponse(format!("Bad stream fragment: {}", e)))?;
    if let Some(message) = &chunk.error {
        return Err(ProviderError::Api {
            status: 200,
            message: message.clone(),
        });
    }
    Ok(Some(chunk))
}

/// Turn NDJSON lines into chat fragments
///
/// One line is read per fragment pulled. The stream ends at EOF or right
/// after the fragment marked `done`.
pub fn ndjson_chunks<S>(
    mut lines: S,
) -> impl Stream<Item = Result<ChatResponseChunk, ProviderError>> + Send
where
    S: Stream<Item = std::io::Result<String>> + Send + Unpin,
{
    async_stream::try_stream! {
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| ProviderError::Transport(e.to_string()))?;
            let chunk = match decode_chunk_line(&line)? {
                Some(chunk) => chunk,
                None => continue,
            };
            let done = chunk.done;
            yield chunk;
            if done {
                break;
            }
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponseChunk, ProviderError> {
        let mut request = request.clone();
        request.stream = false;

        let reply: ChatResponseChunk = self
            .post(endpoint::CHAT, &request)
            .await?
            .json()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;

        if let Some(message) = &reply.error {
            return Err(ProviderError::Api {
                status: 200,
                message: message.clone(),
            });
        }
        Ok(reply)
    }

    async fn chat_stream(&self, mut request: ChatRequest) -> Result<ChunkStream, ProviderError> {
        request.stream = true;
        let response = self.post(endpoint::CHAT, &request).await?;

        use futures::TryStreamExt;
        use tokio::io::AsyncBufReadExt;
        use tokio_stream::wrappers::LinesStream;

        let byte_stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = tokio_util::io::StreamReader::new(byte_stream);
        let lines = tokio::io::BufReader::new(reader).lines();
        let lines = Box::pin(LinesStream::new(lines));

        Ok(Box::pin(ndjson_chunks(lines)))
    }

    async fn embed(
        &self,
        model: &str,
        inputs: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let expected = inputs.len();
        let request = EmbedRequest {
            model: model.to_string(),
            input: inputs,
        };

        let response: EmbedResponse = self
            .post(endpoint::EMBED, &request)
            .await?
            .json()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse embeddings: {}", e))
            })?;

        if response.embeddings.len() != expected {
            return Err(ProviderError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                expected,
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    fn provider_name(&self) -> &str {
        if self.authorization.is_some() {
            "Ollama Cloud"
        } else {
            "Ollama"
        }
    }
}
