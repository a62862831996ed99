//! Extraction request and its typed configuration
//!
//! A [`GraphConfig`] always carries both the LLM and the embedding section,
//! so an incomplete configuration cannot be constructed, loaded or submitted.

use crate::core::config::ConfigError;
use crate::core::constants::{self, extraction};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

/// Model identifier with an optional provider prefix, e.g. `ollama/phi3:mini`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    provider: Option<String>,
    name: String,
}

impl ModelId {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let (provider, name) = match raw.split_once('/') {
            Some((provider, name)) => (Some(provider.to_lowercase()), name),
            None => (None, raw),
        };

        if name.is_empty() {
            return Err(ConfigError::InvalidModel(raw.to_string()));
        }
        if let Some(provider) = &provider {
            if provider != constants::OLLAMA_PROVIDER {
                return Err(ConfigError::UnsupportedProvider(provider.clone()));
            }
        }

        Ok(Self {
            provider,
            name: name.to_string(),
        })
    }

    /// Name as the Ollama server knows it, without the provider prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl TryFrom<String> for ModelId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelId> for String {
    fn from(id: ModelId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "{}/{}", provider, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Output format requested from the LLM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: ModelId,
    /// Context window in tokens. Accepts `8192` or `"8192"`.
    #[serde(
        default = "default_model_tokens",
        deserialize_with = "deserialize_model_tokens"
    )]
    pub model_tokens: u32,
    #[serde(default)]
    pub format: ResponseFormat,
    #[serde(default = "default_base_url")]
    pub base_url: Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: ModelId,
    #[serde(default = "default_base_url")]
    pub base_url: Url,
}

/// Extraction graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub headless: bool,
    /// Per-request timeout in seconds; no timeout when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

fn default_model_tokens() -> u32 {
    extraction::MODEL_TOKENS
}

fn default_base_url() -> Url {
    Url::parse(extraction::BASE_URL).expect("default base URL is valid")
}

fn default_verbose() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTokens {
    Number(i64),
    Text(String),
}

fn deserialize_model_tokens<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match RawTokens::deserialize(deserializer)? {
        RawTokens::Number(n) => n.to_string(),
        RawTokens::Text(s) => s,
    };
    parse_model_tokens(&raw).map_err(serde::de::Error::custom)
}

/// Parse a token budget, rejecting zero, negatives and non-numbers
pub fn parse_model_tokens(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidModelTokens(raw.to_string())),
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                model: ModelId::parse(extraction::LLM_MODEL).expect("default LLM model is valid"),
                model_tokens: extraction::MODEL_TOKENS,
                format: ResponseFormat::Json,
                base_url: default_base_url(),
            },
            embedding: EmbeddingConfig {
                model: ModelId::parse(extraction::EMBEDDING_MODEL)
                    .expect("default embedding model is valid"),
                base_url: default_base_url(),
            },
            verbose: true,
            headless: false,
            request_timeout: None,
        }
    }
}

/// A prompt, the document to answer it from, and how to run the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRequest {
    pub prompt: String,
    pub source: Url,
    pub config: GraphConfig,
}

impl ExtractionRequest {
    /// Build a request, trimming the prompt and validating the source URL
    pub fn new(prompt: &str, source: &str, config: GraphConfig) -> Result<Self, ConfigError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ConfigError::EmptyPrompt);
        }

        let source = Url::parse(source).map_err(|e| ConfigError::InvalidUrl {
            url: source.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(source.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: source.to_string(),
                reason: format!("unsupported scheme '{}'", source.scheme()),
            });
        }

        Ok(Self {
            prompt: prompt.to_string(),
            source,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_strips_provider() {
        let id = ModelId::parse("ollama/phi3:mini").unwrap();
        assert_eq!(id.provider(), Some("ollama"));
        assert_eq!(id.name(), "phi3:mini");
        assert_eq!(id.to_string(), "ollama/phi3:mini");

        let bare = ModelId::parse("nomic-embed-text").unwrap();
        assert_eq!(bare.provider(), None);
        assert_eq!(bare.name(), "nomic-embed-text");
    }

    #[test]
    fn test_model_id_rejects_other_providers() {
        assert!(matches!(
            ModelId::parse("openai/gpt-4o"),
            Err(ConfigError::UnsupportedProvider(p)) if p == "openai"
        ));
        assert!(matches!(
            ModelId::parse("ollama/"),
            Err(ConfigError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_parse_model_tokens() {
        assert_eq!(parse_model_tokens("8192").unwrap(), 8192);
        assert_eq!(parse_model_tokens(" 512 ").unwrap(), 512);
        assert!(parse_model_tokens("0").is_err());
        assert!(parse_model_tokens("-1").is_err());
        assert!(parse_model_tokens("lots").is_err());
    }

    #[test]
    fn test_model_tokens_accepts_string_or_integer() {
        let as_string: LlmConfig =
            toml::from_str("model = \"ollama/phi3:mini\"\nmodel_tokens = \"8192\"").unwrap();
        let as_int: LlmConfig =
            toml::from_str("model = \"ollama/phi3:mini\"\nmodel_tokens = 8192").unwrap();
        assert_eq!(as_string.model_tokens, 8192);
        assert_eq!(as_int, as_string);
    }

    #[test]
    fn test_default_config_matches_local_ollama() {
        let config = GraphConfig::default();
        assert_eq!(config.llm.model.name(), "phi3:mini");
        assert_eq!(config.llm.model_tokens, 8192);
        assert_eq!(config.llm.format, ResponseFormat::Json);
        assert_eq!(config.llm.base_url.as_str(), "http://localhost:11434/");
        assert_eq!(config.embedding.model.name(), "nomic-embed-text");
        assert!(config.verbose);
        assert!(!config.headless);
    }

    #[test]
    fn test_request_shape() {
        let request = ExtractionRequest::new(
            extraction::PROMPT,
            extraction::SOURCE,
            GraphConfig::default(),
        )
        .unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["prompt"],
            "Hello! Tell me the title of the topic in the source"
        );
        assert_eq!(value["source"], "https://en.wikipedia.org/wiki/Alpaca");
        assert_eq!(value["config"]["llm"]["format"], "json");
        assert_eq!(value["config"]["embedding"]["model"], "ollama/nomic-embed-text");
    }

    #[test]
    fn test_request_rejects_bad_source() {
        let err = ExtractionRequest::new("title?", "not a url", GraphConfig::default());
        assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));

        let err = ExtractionRequest::new("title?", "ftp://example.com/x", GraphConfig::default());
        assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));

        let err = ExtractionRequest::new("   ", extraction::SOURCE, GraphConfig::default());
        assert!(matches!(err, Err(ConfigError::EmptyPrompt)));
    }
}
