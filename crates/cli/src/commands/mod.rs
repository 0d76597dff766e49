pub mod config_cmd;
pub mod doctor;
pub mod init;
pub mod refine;
pub mod roles;
pub mod stage;
pub mod support;

use std::path::Path;

use kyoryoku_agent::Orchestrator;
use kyoryoku_config::AppConfig;
use kyoryoku_core::PipelineContext;

/// Load config and build the orchestrator, failing fast on missing credentials.
pub(crate) fn orchestrator(
    config_path: Option<&Path>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let config = AppConfig::load_with(config_path)?;
    Ok(Orchestrator::from_config(&config)?)
}

/// Parse a `--context` argument. It must be a JSON object.
pub(crate) fn parse_context(
    raw: Option<&str>,
) -> Result<PipelineContext, Box<dyn std::error::Error>> {
    let Some(raw) = raw else {
        return Ok(PipelineContext::new());
    };
    match serde_json::from_str(raw)? {
        serde_json::Value::Object(map) => Ok(PipelineContext::from_map(map)),
        other => Err(format!("--context must be a JSON object, got: {other}").into()),
    }
}
