//! Ollama runners
//!
//! Two small command-line tools built on the Ollama HTTP API:
//!
//! - `smart-scraper` answers a fixed question about a web page with a local
//!   LLM and embedding model and prints the JSON answer.
//! - `cloud-chat` streams a chat reply from the hosted Ollama service,
//!   authenticated with `OLLAMA_API_KEY` from `.env`.

pub mod core;
pub mod models;
pub mod runner;
