//! Application configuration management
//!
//! Both runners read the same optional TOML file (`CONFIG_PATH`, default
//! `config.toml`). The extraction runner needs the `[llm]` and `[embedding]`
//! tables; the chat runner only reads `[chat]`. The chat credential never
//! lives in the file: it comes from the `.env` file or the environment and is
//! handed to the client explicitly.

use crate::core::constants::{self, chat, env};
use crate::models::graph::GraphConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Configuration faults detected before any network activity
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing OLLAMA_API_KEY. Did you set it in .env?")]
    MissingApiKey,

    #[error("Invalid model identifier: '{0}'")]
    InvalidModel(String),

    #[error("Unsupported model provider '{0}' (expected 'ollama')")]
    UnsupportedProvider(String),

    #[error("model_tokens must be a positive integer, got '{0}'")]
    InvalidModelTokens(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Extraction prompt is empty")]
    EmptyPrompt,
}

/// Bearer credential for the hosted chat endpoint
///
/// Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key. An empty key counts as missing; anything else is kept verbatim.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Resolve the key from an optional environment value
pub fn api_key_from(value: Option<String>) -> Result<ApiKey, ConfigError> {
    value.map_or(Err(ConfigError::MissingApiKey), ApiKey::new)
}

/// Whether `env_file` is the bare default name, looked up from the current
/// directory upwards rather than at one fixed path
fn searches_parents(env_file: &Path) -> bool {
    env_file == Path::new(chat::ENV_FILE)
}

/// Merge `env_file` into the process environment, then read `OLLAMA_API_KEY`
///
/// Variables already present in the environment win over the file. A missing
/// file is not an error; a malformed one is logged and skipped.
pub fn load_api_key(env_file: &Path) -> Result<ApiKey, ConfigError> {
    let loaded = if searches_parents(env_file) {
        dotenv::dotenv()
    } else {
        dotenv::from_path(env_file).map(|()| env_file.to_path_buf())
    };

    match loaded {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No env file at {}", env_file.display()),
        Err(e) => warn!("Ignoring env file {}: {}", env_file.display(), e),
    }

    api_key_from(std::env::var(env::OLLAMA_API_KEY).ok())
}

/// Streaming chat settings (`[chat]` table)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_host")]
    pub host: Url,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
    /// Per-request timeout in seconds; no timeout when unset
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

fn default_chat_host() -> Url {
    Url::parse(chat::HOST).expect("default chat host is valid")
}

fn default_chat_model() -> String {
    chat::MODEL.to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(chat::ENV_FILE)
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: default_chat_host(),
            model: default_chat_model(),
            env_file: default_env_file(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatFile {
    #[serde(default)]
    chat: ChatConfig,
}

impl ChatConfig {
    /// Parse the `[chat]` table out of a config file's contents
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ChatFile =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        Ok(file.chat)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::from_toml(&content)
    }

    /// Load from `CONFIG_PATH` (or `config.toml`), falling back to defaults
    pub fn from_env() -> Result<Self> {
        match read_config_file()? {
            Some(content) => Self::from_toml(&content),
            None => Ok(Self::default()),
        }
    }
}

impl GraphConfig {
    /// Parse an extraction configuration; `[llm]` and `[embedding]` are required
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context(
            "Failed to parse TOML configuration (both [llm] and [embedding] are required)",
        )
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::from_toml(&content)
    }

    /// Load from `CONFIG_PATH` (or `config.toml`), falling back to defaults
    pub fn from_env() -> Result<Self> {
        match read_config_file()? {
            Some(content) => Self::from_toml(&content),
            None => Ok(Self::default()),
        }
    }
}

/// Read the configuration file, if any
///
/// An explicit `CONFIG_PATH` must exist. The default `config.toml` is optional.
fn read_config_file() -> Result<Option<String>> {
    let (path, explicit) = match std::env::var(env::CONFIG_PATH) {
        Ok(path) => (PathBuf::from(path), true),
        Err(_) => (PathBuf::from(constants::DEFAULT_CONFIG_FILE), false),
    };

    if !explicit && !path.exists() {
        debug!("No {} found, using built-in defaults", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(Some(content))
}
