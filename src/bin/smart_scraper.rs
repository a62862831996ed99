//! Extraction runner
//!
//! Asks a local Ollama model for the title of the topic on a Wikipedia page
//! and prints the JSON answer.

use anyhow::{Context, Result};
use ollama_runners::core::logging::init_logging;
use ollama_runners::models::graph::GraphConfig;
use ollama_runners::runner::extraction;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    // Load configuration
    let config = match GraphConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.verbose);

    if let Err(e) = run(config).await {
        error!("Extraction failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: GraphConfig) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    extraction::run(config, &mut stdout)
        .await
        .context("Smart scraper run failed")?;
    Ok(())
}

/// Print help message
fn print_help() {
    println!("smart-scraper {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: smart-scraper [--help]");
    println!();
    println!("Environment variables:");
    println!("  CONFIG_PATH - TOML configuration file (default: config.toml, optional)");
    println!("  LOG_LEVEL   - Logging level when verbose = false (default: warn)");
    println!("  RUST_LOG    - Full tracing filter, overrides LOG_LEVEL");
    println!();
    println!("Configuration ([llm] and [embedding] are required when a file is used):");
    println!("  [llm]       model, model_tokens, format, base_url");
    println!("  [embedding] model, base_url");
    println!("  verbose, headless, request_timeout");
}
