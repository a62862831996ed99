//! Core application modules
//!
//! This module contains configuration, constants, logging, the Ollama client
//! and the extraction service.

pub mod client;
pub mod config;
pub mod constants;
pub mod logging;
pub mod provider;
pub mod providers;
