// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Node assembly: validated config in, running engine plus HTTP server out.

use crate::config::BridgeNodeConfig;
use crate::engine::{BridgeEngine, StaticRolePolicy};
use crate::metrics::BridgeMetrics;
use crate::server::handler::BridgeRequestHandler;
use crate::server::{run_server, AppState};
use crate::token::{InMemoryLedger, TokenLedger};
use prometheus::Registry;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::info;

pub fn build_engine(
    config: &BridgeNodeConfig,
    ledger: Arc<dyn TokenLedger>,
    metrics: Arc<BridgeMetrics>,
) -> anyhow::Result<Arc<BridgeEngine>> {
    let (params, committees) = config.validate()?;
    let roles = Arc::new(StaticRolePolicy::new(config.admin_addresses.iter().copied()));
    Ok(Arc::new(BridgeEngine::new(
        config.local_chain,
        committees,
        params,
        ledger,
        config.custody_address,
        config.tokens.clone(),
        roles,
        metrics,
    )))
}

/// Run the bridge node until the server exits.
pub async fn run_bridge_node(
    config: BridgeNodeConfig,
    registry: Registry,
) -> anyhow::Result<()> {
    let metrics = Arc::new(BridgeMetrics::new(&registry));
    // In-memory settlement; a production deployment plugs a real ledger in
    // through `build_engine`.
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = build_engine(&config, ledger, metrics.clone())?;
    info!(
        chain = %engine.local_chain(),
        tokens = config.tokens.len(),
        committees = config.committees.len(),
        "bridge node starting"
    );

    let socket_address = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
        config.server_listen_port,
    );
    let state = AppState {
        handler: Arc::new(BridgeRequestHandler::new(engine)),
        registry,
        metrics,
    };
    run_server(&socket_address, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_node_config;

    #[tokio::test]
    async fn test_build_engine_from_config() {
        let config = test_node_config();
        let metrics = Arc::new(BridgeMetrics::new_for_testing());
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = build_engine(&config, ledger, metrics).unwrap();
        assert_eq!(engine.local_chain(), config.local_chain);
        assert!(!engine.is_paused());
        assert!(engine.verifier().committee(config.local_chain).is_some());
    }

    #[tokio::test]
    async fn test_build_engine_rejects_bad_config() {
        let mut config = test_node_config();
        config.admin_addresses.clear();
        let metrics = Arc::new(BridgeMetrics::new_for_testing());
        let ledger = Arc::new(InMemoryLedger::new());
        assert!(build_engine(&config, ledger, metrics).is_err());
    }
}
