//! AI Gateway command-line entry point.
//!
//! Loads a gateway configuration and either validates it or runs a batch of
//! JSON-lines requests through the gateway.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gateway_config::GatewayConfig;
use gateway_core::{GatewayError, OperationInput, OperationRequest};
use gateway_service::AiGateway;
use gateway_telemetry::init_logging;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Multi-provider AI request gateway
#[derive(Parser, Debug)]
#[command(name = "ai-gateway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (.yaml, .yml or .toml)
    #[arg(short, long, env = "AI_GATEWAY_CONFIG", default_value = "gateway.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a JSON-lines batch of requests and print results
    Run(RunArgs),

    /// Validate the configuration and list provider capabilities
    Check,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// File with one request per line, each carrying an `operation` tag
    #[arg(short, long, env = "AI_GATEWAY_REQUESTS")]
    requests: PathBuf,

    /// Skip the statistics summary after the batch
    #[arg(long)]
    no_stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GatewayConfig::load(&cli.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Run(args) => run(config, args).await,
        Commands::Check => check(config),
    }
}

async fn run(config: GatewayConfig, args: RunArgs) -> Result<()> {
    let gateway = AiGateway::from_config(config).await?;

    let file = tokio::fs::File::open(&args.requests)
        .await
        .with_context(|| format!("Failed to open {}", args.requests.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut line_number = 0usize;
    let mut failures = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<OperationRequest<OperationInput>>(&line) {
            Ok(request) => match gateway.dispatch(request).await {
                Ok(result) => result,
                Err(e) => {
                    failures += 1;
                    error_line(line_number, &e)
                }
            },
            Err(e) => {
                failures += 1;
                let error = GatewayError::validation(
                    format!("invalid request: {e}"),
                    None,
                    "invalid_request",
                );
                error_line(line_number, &error)
            }
        };
        println!("{output}");
    }

    info!(requests = line_number, failures = failures, "Batch complete");

    if !args.no_stats {
        println!("{}", serde_json::to_string_pretty(&gateway.statistics())?);
    }
    Ok(())
}

fn check(config: GatewayConfig) -> Result<()> {
    let configured: Vec<_> = config.enabled_providers().map(|p| p.kind).collect();
    let gateway = AiGateway::builder().config(config).build()?;
    let capabilities = gateway.capabilities();

    println!("Configuration is valid");
    for kind in configured {
        match capabilities.get(&kind) {
            Some(operations) => {
                let names: Vec<_> = operations.iter().map(ToString::to_string).collect();
                println!("  {kind}: {}", names.join(", "));
            }
            None => println!("  {kind}: not registered (missing credentials)"),
        }
    }
    Ok(())
}

fn error_line(line: usize, error: &GatewayError) -> Value {
    json!({
        "line": line,
        "success": false,
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
            "provider": error.provider_kind(),
            "status_code": error.status_code(),
        }
    })
}
