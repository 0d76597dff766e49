//! `kyoryoku doctor`: diagnose configuration and provider health.

use std::path::Path;

use kyoryoku_agent::Orchestrator;
use kyoryoku_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Kyoryoku Doctor: System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults (run `kyoryoku init`)", path.display());
    }

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!(
        "  ℹ️  Provider {} / model {}",
        config.default_provider,
        config.effective_model()
    );

    if let Err(e) = config.require_credentials() {
        println!("  ❌ {e}");
        issues += 1;
    } else {
        println!("  ✅ Credentials present");

        match kyoryoku_providers::build_base(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider endpoint reachable"),
                Ok(false) => {
                    println!("  ❌ Provider endpoint answered with an error");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider endpoint unreachable: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Provider could not be built: {e}");
                issues += 1;
            }
        }

        // End-to-end probe through the full stage path.
        let orchestrator = Orchestrator::from_config(&config)?;
        let report = orchestrator.health_check().await;
        if report.reachable {
            println!(
                "  ✅ Probe stage answered (confidence {:.2})",
                report.confidence
            );
        } else {
            println!(
                "  ❌ Probe stage failed: {}",
                report.error.unwrap_or_default()
            );
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
