//! MeshNode - SecureMesh node daemon

use anyhow::Result;
use clap::Parser;
use meshnode::{Config, MeshNode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "meshnode")]
#[command(about = "SecureMesh node daemon")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "MESHNODE_CONFIG")]
    config: Option<PathBuf>,

    /// Write a default configuration with a fresh secret and exit
    #[arg(long)]
    init: bool,

    /// Log level or filter directive, overrides the configuration
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init {
        let config = Config::create_default(args.config)?;
        println!("Configuration written to {}", config.config_path().display());
        println!("Share mesh.secret with every node that should join this mesh.");
        return Ok(());
    }

    let config = Config::load(args.config)?;
    let level = args
        .log_level
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, args.json_logs || config.logging.json);

    info!("Loaded configuration from {}", config.config_path().display());
    securemesh_core::init()?;

    let mut node = MeshNode::start(&config).await?;
    node.run().await
}

/// Install the tracing subscriber; `RUST_LOG` wins over `level`
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).try_init().ok();
    } else {
        registry.with(fmt::layer().with_target(true)).try_init().ok();
    }
}
