//! Logging configuration and initialization
//!
//! Logs go to stderr so stdout carries only the runner's output.

use crate::core::constants::env;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Normalise a log level string
///
/// Takes the first word only, maps `warning` to `warn` and `critical` to
/// `error`, and falls back to [`DEFAULT_LOG_LEVEL`] for anything unknown.
pub fn normalize_level(log_level: &str) -> &'static str {
    let level = log_level
        .split_whitespace()
        .next()
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_lowercase();

    match level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => DEFAULT_LOG_LEVEL,
    }
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` wins when set. Otherwise `LOG_LEVEL` is used, raised to
/// `debug` when `verbose` is true.
pub fn init_logging(verbose: bool) {
    let configured = std::env::var(env::LOG_LEVEL).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
    let level = if verbose {
        "debug"
    } else {
        normalize_level(&configured)
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
