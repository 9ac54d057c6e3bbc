// SPDX-License-Identifier: PMPL-1.0-or-later
//! Conformance runner binary
//!
//! Runs a YAML test plan and prints the report. Exits non-zero when any
//! case fails.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use statebridge_conformance::{ComponentRegistry, Runner, TestConfiguration};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Run statebridge component conformance tests.
#[derive(Parser, Debug)]
#[command(name = "conformance", version = VERSION, about = "Conformance tests for statebridge components")]
struct Cli {
    /// Path to the YAML test plan.
    #[arg(long, env = "STATEBRIDGE_CONFORMANCE_CONFIG", required_unless_present = "list")]
    config: Option<PathBuf>,

    /// Only run the named component.
    #[arg(long)]
    component: Option<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Use a fixed run id instead of a random one.
    #[arg(long)]
    run_id: Option<String>,

    /// List the registered components and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON reports on stdout stay parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ComponentRegistry::with_defaults();

    if cli.list {
        println!("state:  {}", registry.state_components().join(", "));
        println!("pubsub: {}", registry.pubsub_components().join(", "));
        return Ok(());
    }

    let path = cli.config.ok_or("--config is required")?;
    let mut plan = TestConfiguration::load(&path)?;
    if let Some(name) = &cli.component {
        plan.retain_component(name);
        if plan.components.is_empty() {
            return Err(format!("component '{}' is not listed in {}", name, path.display()).into());
        }
    }

    let mut runner = Runner::new(registry);
    if let Some(run_id) = cli.run_id {
        runner = runner.with_run_id(run_id);
    }
    tracing::info!("Running {} from {}", plan.component_type.as_str(), path.display());

    let report = runner.run(&plan).await;
    match cli.format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!("{}", report.render_json()?),
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
