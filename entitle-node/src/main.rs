//! Entitlement node
//!
//! Runs the licensing service against an in-process store, logs every
//! entitlement change, and issues the cluster trial on first start.
//!
//! Usage:
//!   entitle-node --config node.toml [--license license.json [--acknowledge]]

use anyhow::{bail, Result};
use clap::Parser;
use entitle_node::{read_license, Node, NodeConfig};
use entitle_service::RegistrationStatus;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "entitle-node")]
#[command(about = "Entitlement lifecycle node")]
struct Args {
    /// Path to the node config file
    #[arg(short, long, default_value = "node.toml")]
    config: PathBuf,

    /// License document to register at startup
    #[arg(short, long)]
    license: Option<PathBuf>,

    /// Accept the consequences reported for the license
    #[arg(long, requires = "license")]
    acknowledge: bool,

    /// Enable verbose debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Entitlement node starting...");
    let config = NodeConfig::load(&args.config)?;
    let node = Node::build(&config)?;
    node.service.init().await?;

    if let Some(path) = &args.license {
        let record = read_license(path)?;
        let response = node.service.register(record, args.acknowledge).await?;
        match response.status {
            RegistrationStatus::Valid => info!("License registered"),
            RegistrationStatus::NeedsAcknowledgment => {
                if let Some(header) = &response.header {
                    warn!("{}", header);
                }
                for (source, messages) in &response.acknowledgments {
                    for message in messages {
                        warn!("[{}] {}", source, message);
                    }
                }
            }
            status => {
                node.service.shutdown().await;
                bail!("License rejected: {:?}", status);
            }
        }
    }

    println!("\n========================================");
    println!("  Entitlement Node Running");
    println!("========================================");
    println!("  Leader: {}", config.leader);
    println!("  State:  {}", node.service.current_state());
    if let Some(record) = node.service.current_record() {
        println!("  Record: {}", record);
    }
    println!("========================================\n");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    node.service.shutdown().await;
    Ok(())
}
