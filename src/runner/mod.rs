//! The two command entry points, as library functions
//!
//! Each runner assembles its inputs, makes one call against its service and
//! writes the outcome to a caller-supplied writer (stdout in the binaries).

pub mod chat;
pub mod extraction;

use crate::core::config::ConfigError;
use crate::core::provider::ProviderError;
use thiserror::Error;

/// Failure of a runner
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
