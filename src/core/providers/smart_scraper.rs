//! Smart scraper extraction service
//!
//! Answers a natural-language prompt from a single web page:
//! fetch, reduce the HTML to text, rank chunks against the prompt with the
//! embedding model when the page does not fit the LLM's context, then ask
//! the LLM for a JSON answer.

use crate::core::client::OllamaClient;
use crate::core::provider::{ChatProvider, ExtractionService, ProviderError};
use crate::models::graph::{ExtractionRequest, GraphConfig};
use crate::models::ollama::{ChatMessage, ChatRequest, ModelOptions};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Rough size of a token in characters
const CHARS_PER_TOKEN: usize = 4;

/// Largest chunk sent for embedding, in tokens
const CHUNK_TOKENS: u32 = 512;

/// Tokens kept free for instructions and the answer
const RESERVED_TOKENS: u32 = 1024;

const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "iframe", "object", "embed", "svg",
    "canvas", "form", "button", "select", "textarea", "nav", "footer", "aside",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "h1", "h2", "h3", "h4", "h5", "h6",
    "ul", "ol", "li", "dl", "dt", "dd", "table", "tr", "blockquote", "pre", "br", "figcaption",
];

const SYSTEM_PROMPT: &str = "You extract information from web pages. \
Answer the question using only the page content you are given. \
Reply with a single JSON object. \
If the page does not contain the answer, reply with {\"content\": \"NA\"}.";

/// Readable text of a page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub title: Option<String>,
    pub text: String,
}

impl PageText {
    /// Title (if any) followed by the body text
    pub fn into_document(self) -> String {
        match self.title {
            Some(title) if !self.text.is_empty() => format!("{}\n{}", title, self.text),
            Some(title) => title,
            None => self.text,
        }
    }
}

/// Reduce an HTML document to its readable text
pub fn page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty());

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(body, &mut raw);

    let text = raw
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    PageText { title, text }
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    let block = BLOCK_TAGS.contains(&name);
                    if block {
                        out.push('\n');
                    }
                    collect_text(child_element, out);
                    if block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokens available for page content in a context of `model_tokens`
pub fn content_budget_tokens(model_tokens: u32) -> u32 {
    let budget = if model_tokens > 2 * RESERVED_TOKENS {
        model_tokens - RESERVED_TOKENS
    } else {
        model_tokens / 2
    };
    budget.max(1)
}

/// Split text into word-aligned chunks of at most `max_chars` characters
///
/// A single word longer than `max_chars` is cut.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word: String = word.chars().take(max_chars).collect();
        let word_len = word.chars().count();
        let needed = if current.is_empty() { word_len } else { word_len + 1 };

        if current_len + needed > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(&word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Pick the best-scoring chunks that fit in `budget_chars`, in document order
pub fn select_chunks(chunks: &[String], scores: &[f32], budget_chars: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..chunks.len().min(scores.len())).collect();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let mut selected = Vec::new();
    let mut used = 0;
    for index in ranked {
        let len = chunks[index].chars().count();
        if used + len > budget_chars && !selected.is_empty() {
            continue;
        }
        used += len;
        selected.push(index);
    }

    selected.sort_unstable();
    selected
}

/// Parse the model's reply as JSON, tolerating a fenced code block
pub fn parse_answer(raw: &str) -> Result<Value, ProviderError> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim()).map_err(|e| {
        ProviderError::InvalidResponse(format!("Model reply is not valid JSON ({}): {}", e, raw))
    })
}

/// Extraction service backed by an Ollama LLM and embedding model
pub struct SmartScraper {
    llm: Arc<dyn ChatProvider>,
    embedder: Arc<dyn ChatProvider>,
    http: Client,
}

impl SmartScraper {
    /// Build clients for the configured LLM and embedding servers
    pub fn from_config(config: &GraphConfig) -> Result<Self, ProviderError> {
        let llm = OllamaClient::new(config.llm.base_url.clone(), None, config.request_timeout)?;
        let embedder = OllamaClient::new(
            config.embedding.base_url.clone(),
            None,
            config.request_timeout,
        )?;

        let mut builder =
            Client::builder().user_agent(concat!("ollama-runners/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_providers(Arc::new(llm), Arc::new(embedder), http))
    }

    pub fn with_providers(
        llm: Arc<dyn ChatProvider>,
        embedder: Arc<dyn ChatProvider>,
        http: Client,
    ) -> Self {
        Self {
            llm,
            embedder,
            http,
        }
    }

    /// Download the source document
    pub async fn fetch_source(&self, source: &Url) -> Result<String, ProviderError> {
        let fetch_error = |message: String| ProviderError::Fetch {
            url: source.to_string(),
            message,
        };

        let response = self
            .http
            .get(source.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }

    /// Answer the request from already-fetched HTML
    pub async fn answer(
        &self,
        request: &ExtractionRequest,
        html: &str,
    ) -> Result<Value, ProviderError> {
        let config = &request.config;
        let document = page_text(html).into_document();
        debug!(chars = document.chars().count(), "Reduced page to text");

        let budget_chars =
            content_budget_tokens(config.llm.model_tokens) as usize * CHARS_PER_TOKEN;
        let content = if document.chars().count() <= budget_chars {
            document
        } else {
            self.relevant_content(request, &document, budget_chars).await?
        };

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Question: {}\n\nPage ({}):\n{}",
                request.prompt, request.source, content
            )),
        ];

        let mut chat = ChatRequest::new(config.llm.model.name(), messages);
        chat.format = Some(config.llm.format.as_str().to_string());
        chat.options = Some(ModelOptions {
            num_ctx: Some(config.llm.model_tokens),
            temperature: Some(0.0),
        });

        debug!(model = %config.llm.model, "Asking LLM");
        let reply = self.llm.chat(&chat).await?;
        parse_answer(reply.content())
    }

    /// Keep the chunks most similar to the prompt
    async fn relevant_content(
        &self,
        request: &ExtractionRequest,
        document: &str,
        budget_chars: usize,
    ) -> Result<String, ProviderError> {
        let config = &request.config;
        let chunk_tokens = CHUNK_TOKENS.min(content_budget_tokens(config.llm.model_tokens));
        let chunks = split_chunks(document, chunk_tokens as usize * CHARS_PER_TOKEN);

        let mut inputs = Vec::with_capacity(chunks.len() + 1);
        inputs.push(request.prompt.clone());
        inputs.extend(chunks.iter().cloned());

        debug!(
            chunks = chunks.len(),
            model = %config.embedding.model,
            "Embedding chunks"
        );
        let embeddings = self
            .embedder
            .embed(config.embedding.model.name(), inputs)
            .await?;

        let (query, chunk_vectors) = embeddings
            .split_first()
            .ok_or_else(|| ProviderError::InvalidResponse("No embeddings returned".to_string()))?;
        let scores: Vec<f32> = chunk_vectors
            .iter()
            .map(|vector| cosine_similarity(query, vector))
            .collect();

        let selected = select_chunks(&chunks, &scores, budget_chars);
        debug!(selected = ?selected, "Selected chunks");

        Ok(selected
            .into_iter()
            .map(|index| chunks[index].as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl ExtractionService for SmartScraper {
    async fn run(&self, request: &ExtractionRequest) -> Result<Value, ProviderError> {
        info!(source = %request.source, "Running smart scraper");
        debug!(
            headless = request.config.headless,
            "Fetching source over plain HTTP (no browser rendering)"
        );

        let html = self.fetch_source(&request.source).await?;
        self.answer(request, &html).await
    }

    fn service_name(&self) -> &str {
        "SmartScraper"
    }
}
