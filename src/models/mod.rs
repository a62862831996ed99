//! API data models
//!
//! This module contains the Ollama wire types and the extraction request.

pub mod graph;
pub mod ollama;
