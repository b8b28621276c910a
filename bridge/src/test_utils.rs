// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Builders shared by unit tests across the crate.

use crate::config::{
    AdminParams, BridgeLimitsConfig, BridgeNodeConfig, CommitteeConfig, ValidatorConfig,
};
use crate::engine::{BridgeEngine, StaticRolePolicy, TransferProof};
use crate::metrics::BridgeMetrics;
use crate::token::{InMemoryLedger, TokenMeta};
use relay_bridge_types::{
    BridgeAddress, ChainId, CommitteeMember, TokenId, TokenTransfer, ValidatorCommittee,
    ValidatorKeyPair,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const LOCAL_CHAIN: ChainId = ChainId(1);
pub const REMOTE_CHAIN: ChainId = ChainId(2);
pub const NATIVE_TOKEN: TokenId = TokenId(1);
pub const WRAPPED_TOKEN: TokenId = TokenId(2);

pub fn test_limits() -> BridgeLimitsConfig {
    BridgeLimitsConfig {
        max_per_transfer: 1_000,
        daily_limit: 2_500,
        weekly_limit: 10_000,
        large_transfer_threshold: 1_000,
        default_cooldown_secs: 3_600,
    }
}

pub fn test_tokens() -> Vec<TokenMeta> {
    vec![
        TokenMeta {
            token: NATIVE_TOKEN,
            symbol: "NAT".to_string(),
            origin_chain: LOCAL_CHAIN,
        },
        TokenMeta {
            token: WRAPPED_TOKEN,
            symbol: "WRP".to_string(),
            origin_chain: REMOTE_CHAIN,
        },
    ]
}

pub fn deterministic_keys(count: usize) -> Vec<ValidatorKeyPair> {
    (0..count)
        .map(|i| ValidatorKeyPair::from_bytes(&[i as u8 + 1; 32]))
        .collect()
}

pub fn committee_of(keys: &[ValidatorKeyPair], min_validators: u16) -> ValidatorCommittee {
    let members = keys
        .iter()
        .enumerate()
        .map(|(i, kp)| CommitteeMember::new(kp.public_key_bytes(), format!("validator-{i}")))
        .collect();
    ValidatorCommittee::new(members, min_validators).unwrap()
}

/// A config with one committee, both test tokens and one admin; inputs to
/// config validation tests.
pub fn test_node_config() -> BridgeNodeConfig {
    let keys = deterministic_keys(3);
    BridgeNodeConfig {
        server_listen_port: 9191,
        admin_addresses: vec![BridgeAddress::new([0xad; 32])],
        custody_address: BridgeAddress::new([0xcc; 32]),
        local_chain: LOCAL_CHAIN,
        fee_bps: 0,
        fee_collector: BridgeAddress::ZERO,
        transfer_expiry_secs: 86_400,
        limits: test_limits(),
        user_limits: BTreeMap::new(),
        tokens: test_tokens(),
        committees: vec![CommitteeConfig {
            chain: LOCAL_CHAIN,
            min_validators: 2,
            validators: keys
                .iter()
                .enumerate()
                .map(|(i, kp)| ValidatorConfig {
                    public_key: kp.public_key_bytes(),
                    name: format!("validator-{i}"),
                })
                .collect(),
        }],
    }
}

/// A fully wired engine over an in-memory ledger, with the same committee
/// registered for the local and the remote chain.
pub struct TestBridge {
    pub engine: Arc<BridgeEngine>,
    pub keys: Vec<ValidatorKeyPair>,
    pub min_validators: u16,
    pub ledger: Arc<InMemoryLedger>,
    pub admin: BridgeAddress,
    pub fee_collector: BridgeAddress,
}

pub struct TestBridgeBuilder {
    num_validators: usize,
    min_validators: u16,
    fee_bps: u64,
    limits: BridgeLimitsConfig,
    transfer_expiry_secs: u64,
}

impl Default for TestBridgeBuilder {
    fn default() -> Self {
        Self {
            num_validators: 3,
            min_validators: 2,
            fee_bps: 0,
            limits: test_limits(),
            transfer_expiry_secs: 86_400,
        }
    }
}

impl TestBridgeBuilder {
    pub fn validators(mut self, num: usize, min: u16) -> Self {
        self.num_validators = num;
        self.min_validators = min;
        self
    }

    pub fn fee_bps(mut self, fee_bps: u64) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    pub fn limits(mut self, limits: BridgeLimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn transfer_expiry_secs(mut self, secs: u64) -> Self {
        self.transfer_expiry_secs = secs;
        self
    }

    pub async fn build(self) -> TestBridge {
        let keys = deterministic_keys(self.num_validators);
        let committees = BTreeMap::from([
            (LOCAL_CHAIN, committee_of(&keys, self.min_validators)),
            (REMOTE_CHAIN, committee_of(&keys, self.min_validators)),
        ]);
        let admin = BridgeAddress::new([0xad; 32]);
        let fee_collector = BridgeAddress::new([0xfe; 32]);
        let params = AdminParams {
            limits: self.limits,
            user_limits: BTreeMap::new(),
            fee_bps: self.fee_bps,
            fee_collector,
            transfer_expiry_secs: self.transfer_expiry_secs,
        };
        let ledger = Arc::new(InMemoryLedger::new());
        let engine = BridgeEngine::new(
            LOCAL_CHAIN,
            committees,
            params,
            ledger.clone(),
            BridgeAddress::new([0xcc; 32]),
            test_tokens(),
            Arc::new(StaticRolePolicy::new([admin])),
            Arc::new(BridgeMetrics::new_for_testing()),
        );
        TestBridge {
            engine: Arc::new(engine),
            keys,
            min_validators: self.min_validators,
            ledger,
            admin,
            fee_collector,
        }
    }
}

impl TestBridge {
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub fn builder() -> TestBridgeBuilder {
        TestBridgeBuilder::default()
    }

    /// A fresh funded account holding `amount` of the native token.
    pub async fn fund_user(&self, amount: u64) -> BridgeAddress {
        let user = BridgeAddress::random_for_testing();
        self.ledger.credit(NATIVE_TOKEN, &user, amount);
        user
    }

    /// Put `amount` of fully backed wrapped supply in `user`'s hands:
    /// custody holds the backing, the books show matching lock and mint.
    pub async fn seed_wrapped(&self, user: &BridgeAddress, amount: u64) {
        let reserve = BridgeAddress::random_for_testing();
        self.ledger.credit(WRAPPED_TOKEN, &reserve, amount);
        self.engine
            .tokens()
            .lock(WRAPPED_TOKEN, &reserve, amount)
            .await
            .unwrap();
        self.engine
            .tokens()
            .mint(WRAPPED_TOKEN, user, amount)
            .await
            .unwrap();
    }

    /// Exactly a quorum of signatures over the transfer's payload hash.
    pub fn proof_for(&self, transfer: &TokenTransfer) -> TransferProof {
        self.proof_for_hash(&transfer.payload_hash())
    }

    pub fn proof_for_hash(&self, payload_hash: &[u8; 32]) -> TransferProof {
        TransferProof {
            signatures: self.keys[..self.min_validators as usize]
                .iter()
                .map(|kp| kp.sign(payload_hash))
                .collect(),
        }
    }

    /// A committee of brand-new validators, for rotation tests.
    pub fn fresh_committee(
        num_validators: usize,
        min_validators: u16,
    ) -> (ValidatorCommittee, Vec<ValidatorKeyPair>) {
        let keys: Vec<_> = (0..num_validators)
            .map(|i| ValidatorKeyPair::from_bytes(&[0xA0 + i as u8; 32]))
            .collect();
        (committee_of(&keys, min_validators), keys)
    }
}
