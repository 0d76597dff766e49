//! `kyoryoku support`: run the support pipeline for each request.

use std::fmt::Write as _;
use std::path::Path;

use kyoryoku_agent::{SupportRun, cancel_pair};
use tokio::task::JoinSet;
use tracing::warn;

pub async fn run(
    config_path: Option<&Path>,
    requests: Vec<String>,
    context: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = super::orchestrator(config_path)?;
    let context = super::parse_context(context.as_deref())?;

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight stages");
            handle.cancel();
        }
    });

    // Runs are independent; each gets its own copy of the starting context.
    let mut runs = JoinSet::new();
    for (index, request) in requests.into_iter().enumerate() {
        let orchestrator = orchestrator.clone();
        let context = context.clone();
        let signal = signal.clone();
        runs.spawn(async move {
            let run = orchestrator
                .run_support_with_cancel(&request, context, &signal)
                .await;
            (index, request, run)
        });
    }

    let mut finished = Vec::new();
    while let Some(joined) = runs.join_next().await {
        finished.push(joined?);
    }
    finished.sort_by_key(|(index, _, _)| *index);

    if json {
        let records: Vec<&SupportRun> = finished.iter().map(|(_, _, run)| run).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (_, request, run) in &finished {
        print_run(request, run);
    }
    Ok(())
}

fn print_run(request: &str, run: &SupportRun) {
    print!("{}", render_run(request, run));
}

fn render_run(request: &str, run: &SupportRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🦀 Kyoryoku Support");
    let _ = writeln!(out, "==================");
    let _ = writeln!(out, "  Request:      {request}");
    let _ = writeln!(out, "  Run:          {}", run.run_id);
    for (stage, result) in &run.stages {
        let label = format!("{}:", stage.key());
        let _ = writeln!(
            out,
            "  {label:<13} {:.2}  {}",
            result.confidence(),
            first_line(result.content())
        );
    }
    if let Some(overall) = run.overall_confidence {
        let _ = writeln!(out, "  Overall:      {overall:.2}");
    }
    if run.cancelled {
        let _ = writeln!(out, "\n  ⚠️  Cancelled before completion");
    } else if run.escalated() {
        let _ = writeln!(out, "\n  ⚠️  Escalated to a human agent");
    } else {
        let _ = writeln!(out, "\n  ✅ Resolved without escalation");
    }
    if let Some(reply) = run.response() {
        let _ = writeln!(out, "\n{}", reply.content());
    }
    out.push('\n');
    out
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
