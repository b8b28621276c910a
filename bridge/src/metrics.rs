// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, register_int_gauge_with_registry, IntCounter,
    IntCounterVec, IntGauge, IntGaugeVec, Registry,
};

#[derive(Clone, Debug)]
pub struct BridgeMetrics {
    pub transfers_initiated: IntCounter,
    pub transfers_released: IntCounter,
    pub transfers_expired: IntCounter,
    pub transfers_refunded: IntCounter,
    pub transfers_rejected: IntCounterVec,
    pub messages_sent: IntCounter,
    pub messages_received: IntCounter,
    pub amount_locked: IntGaugeVec,
    pub amount_minted: IntGaugeVec,
    pub pending_transfers: IntGauge,
    pub bridge_paused: IntGauge,
    pub server_requests: IntCounterVec,
}

impl BridgeMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            transfers_initiated: register_int_counter_with_registry!(
                "bridge_transfers_initiated",
                "Total transfers accepted by initiate",
                registry,
            )
            .unwrap(),
            transfers_released: register_int_counter_with_registry!(
                "bridge_transfers_released",
                "Total transfers completed with a valid proof",
                registry,
            )
            .unwrap(),
            transfers_expired: register_int_counter_with_registry!(
                "bridge_transfers_expired",
                "Total transfers that expired awaiting proof",
                registry,
            )
            .unwrap(),
            transfers_refunded: register_int_counter_with_registry!(
                "bridge_transfers_refunded",
                "Total expired transfers refunded to their sender",
                registry,
            )
            .unwrap(),
            transfers_rejected: register_int_counter_vec_with_registry!(
                "bridge_transfers_rejected",
                "Rejected operations by reason",
                &["reason"],
                registry,
            )
            .unwrap(),
            messages_sent: register_int_counter_with_registry!(
                "bridge_messages_sent",
                "Total cross-chain messages sent",
                registry,
            )
            .unwrap(),
            messages_received: register_int_counter_with_registry!(
                "bridge_messages_received",
                "Total cross-chain messages received and executed",
                registry,
            )
            .unwrap(),
            amount_locked: register_int_gauge_vec_with_registry!(
                "bridge_amount_locked",
                "Amount currently held in custody per token",
                &["token"],
                registry,
            )
            .unwrap(),
            amount_minted: register_int_gauge_vec_with_registry!(
                "bridge_amount_minted",
                "Wrapped supply currently minted per token",
                &["token"],
                registry,
            )
            .unwrap(),
            pending_transfers: register_int_gauge_with_registry!(
                "bridge_pending_transfers",
                "Transfers currently awaiting proof",
                registry,
            )
            .unwrap(),
            bridge_paused: register_int_gauge_with_registry!(
                "bridge_paused",
                "1 when the bridge is paused",
                registry,
            )
            .unwrap(),
            server_requests: register_int_counter_vec_with_registry!(
                "bridge_server_requests",
                "HTTP requests by route",
                &["route"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}
