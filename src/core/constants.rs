//! Constants for roles, endpoints and the fixed runner inputs
//!
//! Defaults mirror a local Ollama install for extraction and the hosted
//! Ollama service for chat.

/// Message role constants
pub mod role {
    /// User role identifier
    pub const USER: &str = "user";

    /// Assistant role identifier
    pub const ASSISTANT: &str = "assistant";

    /// System role identifier
    pub const SYSTEM: &str = "system";
}

/// Ollama HTTP endpoint paths
pub mod endpoint {
    /// Chat completion endpoint (streamed or not)
    pub const CHAT: &str = "/api/chat";

    /// Batch embedding endpoint
    pub const EMBED: &str = "/api/embed";
}

/// Environment variable names
pub mod env {
    /// Bearer credential for the hosted chat endpoint
    pub const OLLAMA_API_KEY: &str = "OLLAMA_API_KEY";

    /// Path of the optional TOML configuration file
    pub const CONFIG_PATH: &str = "CONFIG_PATH";

    /// Log level used when `RUST_LOG` is not set
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// Defaults for the extraction runner
pub mod extraction {
    pub const PROMPT: &str = "\n    Hello! Tell me the title of the topic in the source\n    ";
    pub const SOURCE: &str = "https://en.wikipedia.org/wiki/Alpaca";

    pub const LLM_MODEL: &str = "ollama/phi3:mini";
    pub const MODEL_TOKENS: u32 = 8192;
    pub const EMBEDDING_MODEL: &str = "ollama/nomic-embed-text";

    /// Local Ollama server
    pub const BASE_URL: &str = "http://localhost:11434";
}

/// Defaults for the streaming chat runner
pub mod chat {
    pub const HOST: &str = "https://ollama.com";
    pub const MODEL: &str = "gpt-oss:120b";
    pub const QUESTION: &str = "Why is the sky blue?";
    pub const ENV_FILE: &str = ".env";
}

/// Model provider prefix accepted in model identifiers (`ollama/phi3:mini`)
pub const OLLAMA_PROVIDER: &str = "ollama";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
