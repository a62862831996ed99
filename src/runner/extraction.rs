//! Extraction runner
//!
//! Builds the fixed prompt/source request, submits it once and prints the
//! structured result.

use crate::core::constants::extraction;
use crate::core::provider::ExtractionService;
use crate::core::providers::SmartScraper;
use crate::models::graph::{ExtractionRequest, GraphConfig};
use crate::runner::RunError;
use serde_json::Value;
use std::io::Write;
use tracing::info;

/// The runner's request: fixed prompt and source, caller's configuration
pub fn default_request(config: GraphConfig) -> Result<ExtractionRequest, RunError> {
    Ok(ExtractionRequest::new(
        extraction::PROMPT,
        extraction::SOURCE,
        config,
    )?)
}

/// Print a result: strings verbatim, everything else as pretty JSON
pub fn render_result<W: Write>(result: &Value, out: &mut W) -> Result<(), RunError> {
    match result {
        Value::String(text) => writeln!(out, "{}", text)?,
        other => {
            let rendered = serde_json::to_string_pretty(other).map_err(std::io::Error::from)?;
            writeln!(out, "{}", rendered)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Submit `request` once and render whatever comes back
pub async fn submit<S, W>(
    service: &S,
    request: &ExtractionRequest,
    out: &mut W,
) -> Result<Value, RunError>
where
    S: ExtractionService + ?Sized,
    W: Write,
{
    info!(
        service = service.service_name(),
        llm = %request.config.llm.model,
        embedding = %request.config.embedding.model,
        "Submitting extraction request"
    );
    let result = service.run(request).await?;
    render_result(&result, out)?;
    Ok(result)
}

pub async fn run<W: Write>(config: GraphConfig, out: &mut W) -> Result<Value, RunError> {
    let request = default_request(config)?;
    let scraper = SmartScraper::from_config(&request.config)?;
    submit(&scraper, &request, out).await
}
