//! `kyoryoku refine`: iterative content refinement.

use std::fmt::Write as _;
use std::path::Path;

use kyoryoku_agent::{RefinementRequest, RefinementStage, RefinementSummary, cancel_pair};
use tracing::warn;

/// The source text, from `--source` or read from `--file`.
pub fn read_source(
    source: Option<String>,
    file: Option<&Path>,
) -> Result<String, Box<dyn std::error::Error>> {
    match (source, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into()),
        (None, None) => Err("Provide --source or --file".into()),
    }
}

pub async fn run(
    config_path: Option<&Path>,
    source: String,
    content_type: Option<String>,
    audience: Option<String>,
    iterations: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = super::orchestrator(config_path)?;

    let mut request = RefinementRequest::new(source);
    if let Some(content_type) = content_type {
        request = request.content_type(content_type);
    }
    if let Some(audience) = audience {
        request = request.audience(audience);
    }
    if let Some(iterations) = iterations {
        request = request.iterations(iterations);
    }

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current stage");
            handle.cancel();
        }
    });

    let summary = orchestrator.run_refinement_with_cancel(&request, &signal).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print!("{}", render_summary(&summary));
    Ok(())
}

fn render_summary(summary: &RefinementSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🦀 Kyoryoku Refinement");
    let _ = writeln!(out, "=====================");
    let _ = writeln!(out, "  Content type: {}", summary.content_type);
    let _ = writeln!(out, "  Audience:     {}", summary.target_audience);
    let _ = writeln!(
        out,
        "  Rounds:       {} of {} requested",
        summary.total_rounds, summary.requested_rounds
    );
    let _ = writeln!(out, "  Handoffs:     {}", summary.handoff_count);
    for round in &summary.rounds {
        let _ = writeln!(out, "  Round {}:      {:.2}", round.round, round.round_confidence);
        for stage in RefinementStage::CHAIN {
            if let Some(result) = round.get(stage) {
                let _ = writeln!(out, "    {:<13} {:.2}", stage.key(), result.confidence());
            }
        }
    }
    out.push('\n');
    if summary.rounds_capped {
        let _ = writeln!(out, "  ⚠️  Round count capped by refinement.max_iterations");
    }
    if summary.cancelled {
        let _ = writeln!(out, "  ⚠️  Cancelled before completion");
    }
    if summary.coordination_success {
        let _ = writeln!(out, "  ✅ Coordination succeeded");
    } else {
        let _ = writeln!(out, "  ⚠️  Coordination below threshold");
    }
    let _ = writeln!(out, "\n{}", summary.final_content);
    out
}
