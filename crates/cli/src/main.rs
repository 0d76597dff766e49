//! Kyoryoku CLI, the main entry point.
//!
//! Commands:
//! - `support`  Run the customer-support pipeline for one or more requests
//! - `refine`   Run the iterative content-refinement pipeline
//! - `stage`    Call a single agent role
//! - `roles`    List the role catalog
//! - `doctor`   Diagnose configuration and provider health
//! - `init`     Write a starter config file
//! - `config`   Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kyoryoku",
    about = "Kyoryoku: staged multi-agent task orchestration",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.kyoryoku/config.toml
    #[arg(short, long, global = true, env = "KYORYOKU_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the support pipeline (triage, research, response, escalation)
    Support {
        /// Customer request; repeat to run several pipelines concurrently
        #[arg(short, long = "request", required = true)]
        requests: Vec<String>,

        /// Initial context as a JSON object
        #[arg(long)]
        context: Option<String>,

        /// Print the run records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refine a piece of content through the five-role chain
    Refine {
        /// Source material to refine
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        source: Option<String>,

        /// Read the source material from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Target content type, e.g. blog_post
        #[arg(long)]
        content_type: Option<String>,

        /// Target audience, e.g. business_professionals
        #[arg(long)]
        audience: Option<String>,

        /// Number of refinement rounds
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Invoke a single role outside any workflow
    Stage {
        /// Role name from the catalog (unknown names use the default template)
        #[arg(short, long)]
        role: String,

        /// Task for the role
        #[arg(short, long)]
        task: String,

        /// Context as a JSON object
        #[arg(long)]
        context: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in roles
    Roles,

    /// Diagnose configuration and provider health
    Doctor,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays clean on stdout.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Support {
            requests,
            context,
            json,
        } => commands::support::run(config_path, requests, context, json).await?,
        Commands::Refine {
            source,
            file,
            content_type,
            audience,
            iterations,
            json,
        } => {
            let source = commands::refine::read_source(source, file.as_deref())?;
            commands::refine::run(config_path, source, content_type, audience, iterations, json)
                .await?
        }
        Commands::Stage {
            role,
            task,
            context,
            json,
        } => commands::stage::run(config_path, &role, &task, context, json).await?,
        Commands::Roles => commands::roles::run(),
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Init { force } => commands::init::run(config_path, force)?,
        Commands::Config => commands::config_cmd::show(config_path)?,
    }

    Ok(())
}
