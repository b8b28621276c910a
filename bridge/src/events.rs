// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Events emitted by the engine for every state change, fanned out over a
//! tokio broadcast channel. Observers that fall behind lose old events, they
//! never block the engine.

use relay_bridge_types::{BridgeAddress, ChainId, MessageId, TokenId, TransferId};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tokio::sync::broadcast;

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeEvent {
    TokenDeposited {
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
        sender: BridgeAddress,
        token: TokenId,
        amount: u64,
        fee: u64,
        target_chain: ChainId,
    },
    TransferClaimed {
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
        recipient: BridgeAddress,
        token: TokenId,
        amount: u64,
    },
    TransferExpired {
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
    },
    TransferRejected {
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
    },
    TransferRefunded {
        #[serde_as(as = "serde_with::hex::Hex")]
        transfer_id: TransferId,
        sender: BridgeAddress,
        token: TokenId,
        amount: u64,
    },
    MessageSent {
        #[serde_as(as = "serde_with::hex::Hex")]
        message_id: MessageId,
        target_chain: ChainId,
    },
    MessageReceived {
        #[serde_as(as = "serde_with::hex::Hex")]
        message_id: MessageId,
        source_chain: ChainId,
    },
    EmergencyOp {
        paused: bool,
    },
    LimitsUpdated,
    ValidatorSetUpdated {
        chain: ChainId,
    },
}

/// Broadcast wrapper; `emit` ignores the no-subscriber case.
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: BridgeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }
}
