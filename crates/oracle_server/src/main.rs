//! Counterfactual Oracle Server
//!
//! REST API server for the scenario evaluation pipeline.

use anyhow::Context;
use clap::Parser;
use oracle_server::config::{build_config, CliArgs as ConfigCliArgs};
use oracle_server::server::Server;
use oracle_server::services::build_service;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Counterfactual Oracle Server - REST API for scenario evaluation
#[derive(Parser, Debug)]
#[command(name = "oracle_server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", env = "ORACLE_CONFIG")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Monte Carlo trials per scenario
    #[arg(long)]
    trials: Option<usize>,

    /// Fixed simulation seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum debate rounds (1-5)
    #[arg(long)]
    debate_rounds: Option<u32>,
}

impl From<Args> for ConfigCliArgs {
    fn from(args: Args) -> Self {
        ConfigCliArgs {
            config_file: args.config,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            trials: args.trials,
            seed: args.seed,
            debate_rounds: args.debate_rounds,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cli_args: ConfigCliArgs = args.into();
    let config = build_config(&cli_args).context("failed to load configuration")?;

    init_tracing(config.log_level.as_filter_str());

    tracing::info!("Counterfactual Oracle Server v{}", oracle_server::VERSION);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_level = %config.log_level,
        max_delta_bps = config.max_delta_bps,
        scenario_timeout_secs = config.scenario_timeout_secs,
        "Server configuration loaded"
    );

    let service = build_service(&config)?;
    let server = Server::new(config, service);
    tracing::info!(address = %server.socket_addr()?, "Starting server");

    server.run().await?;

    Ok(())
}
