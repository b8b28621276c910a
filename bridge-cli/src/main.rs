// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use clap::*;
use prometheus::Registry;
use relay_bridge::node::run_bridge_node;
use relay_bridge::utils::{
    generate_bridge_node_config_template, generate_validator_key_to_file, read_validator_key_file,
};
use relay_bridge_config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay-bridge-cli", about = "Bridge relay node and tooling")]
struct Args {
    #[command(subcommand)]
    command: BridgeCommand,
}

#[derive(Subcommand)]
enum BridgeCommand {
    /// Generate a validator signing key and write the seed to a file.
    CreateBridgeValidatorKey { path: PathBuf },
    /// Print the public key of a validator key file.
    ExamineKey { path: PathBuf },
    /// Write a starter node config (plus a fresh validator key) to edit.
    CreateBridgeNodeConfigTemplate { path: PathBuf },
    /// Run the bridge node with the given config.
    Run {
        #[arg(long)]
        config_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    match args.command {
        BridgeCommand::CreateBridgeValidatorKey { path } => {
            let keypair = generate_validator_key_to_file(&path)?;
            println!("Bridge validator key generated at {}", path.display());
            println!("Public key: {}", hex::encode(keypair.public_key_bytes()));
        }
        BridgeCommand::ExamineKey { path } => {
            let keypair = read_validator_key_file(&path)?;
            println!("Public key: {}", hex::encode(keypair.public_key_bytes()));
        }
        BridgeCommand::CreateBridgeNodeConfigTemplate { path } => {
            generate_bridge_node_config_template(&path)?;
            println!(
                "Bridge node config template generated at {}",
                path.display()
            );
        }
        BridgeCommand::Run { config_path } => {
            let config = relay_bridge::config::BridgeNodeConfig::load(&config_path)?;
            run_bridge_node(config, Registry::new()).await?;
        }
    }
    Ok(())
}
