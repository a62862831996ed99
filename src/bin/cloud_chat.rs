//! Streaming chat runner
//!
//! Streams the hosted model's answer to "Why is the sky blue?" to stdout.

use anyhow::Result;
use ollama_runners::core::config::ChatConfig;
use ollama_runners::core::logging::init_logging;
use ollama_runners::runner::chat;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    init_logging(false);

    // Load configuration
    let config = match ChatConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config).await {
        error!("Chat failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: &ChatConfig) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    chat::run(config, &mut stdout).await?;
    Ok(())
}

/// Print help message
fn print_help() {
    println!("cloud-chat {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: cloud-chat [--help]");
    println!();
    println!("Environment variables:");
    println!("  OLLAMA_API_KEY - Bearer token for ollama.com (required, read from .env)");
    println!("  CONFIG_PATH    - TOML configuration file (default: config.toml, optional)");
    println!("  LOG_LEVEL      - Logging level (default: warn)");
    println!();
    println!("Configuration ([chat] table):");
    println!("  host            - Chat endpoint (default: https://ollama.com)");
    println!("  model           - Model name (default: gpt-oss:120b)");
    println!("  env_file        - Credential file (default: .env)");
    println!("  request_timeout - Seconds; no timeout when unset");
}
