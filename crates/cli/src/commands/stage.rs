//! `kyoryoku stage`: a single agent call.

use std::path::Path;

use kyoryoku_core::RoleOverrides;

pub async fn run(
    config_path: Option<&Path>,
    role: &str,
    task: &str,
    context: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = super::orchestrator(config_path)?;
    let context = super::parse_context(context.as_deref())?;

    if !orchestrator.catalog().contains(role) {
        println!(
            "  ⚠️  Unknown role '{role}', using the {} template",
            orchestrator.catalog().default_role()
        );
    }

    let result = orchestrator
        .run_stage(role, task, &context, &RoleOverrides::none())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("🦀 Kyoryoku Stage");
    println!("================");
    println!("  Role:         {role}");
    println!("  Confidence:   {:.2}", result.confidence());
    println!("  Reasoning:    {}", result.reasoning());
    for suggestion in result.suggestions() {
        println!("  Suggestion:   {suggestion}");
    }
    if result.escalation_needed() {
        println!("\n  ⚠️  Escalation requested");
    }
    println!("\n{}", result.content());
    Ok(())
}
