// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::config::{BridgeLimitsConfig, BridgeNodeConfig, CommitteeConfig, ValidatorConfig};
use crate::token::TokenMeta;
use anyhow::{anyhow, Context};
use relay_bridge_config::Config;
use relay_bridge_types::{BridgeAddress, ChainId, TokenId, ValidatorKeyPair};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

/// Generate a fresh validator keypair and write the seed to `path` as hex.
/// Returns the keypair so the caller can print the public key.
pub fn generate_validator_key_to_file(path: &Path) -> anyhow::Result<ValidatorKeyPair> {
    let keypair = ValidatorKeyPair::generate(&mut rand::thread_rng());
    std::fs::write(path, hex::encode(keypair.to_bytes()))
        .with_context(|| format!("failed to write key file {}", path.display()))?;
    Ok(keypair)
}

/// Read a hex-encoded validator key seed written by
/// [`generate_validator_key_to_file`].
pub fn read_validator_key_file(path: &Path) -> anyhow::Result<ValidatorKeyPair> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let bytes = hex::decode(content.trim())
        .map_err(|e| anyhow!("key file {} is not valid hex: {e}", path.display()))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("key file {} must hold a 32-byte seed", path.display()))?;
    Ok(ValidatorKeyPair::from_bytes(&seed))
}

/// Write a starter node config with one freshly generated validator, ready
/// to be edited. The validator key lands next to the config file.
pub fn generate_bridge_node_config_template(path: &Path) -> anyhow::Result<()> {
    let key_path = path.with_extension("validator.key");
    let keypair = generate_validator_key_to_file(&key_path)?;
    let config = BridgeNodeConfig {
        server_listen_port: 9191,
        admin_addresses: vec![BridgeAddress::new([0x01; 32])],
        custody_address: BridgeAddress::new([0x02; 32]),
        local_chain: ChainId(1),
        fee_bps: 0,
        fee_collector: BridgeAddress::ZERO,
        transfer_expiry_secs: 86_400,
        limits: BridgeLimitsConfig {
            max_per_transfer: 1_000_000,
            daily_limit: 5_000_000,
            weekly_limit: 20_000_000,
            large_transfer_threshold: 500_000,
            default_cooldown_secs: 3_600,
        },
        user_limits: BTreeMap::new(),
        tokens: vec![TokenMeta {
            token: TokenId(1),
            symbol: "NAT".to_string(),
            origin_chain: ChainId(1),
        }],
        committees: vec![CommitteeConfig {
            chain: ChainId(1),
            min_validators: 1,
            validators: vec![ValidatorConfig {
                public_key: keypair.public_key_bytes(),
                name: "validator-0".to_string(),
            }],
        }],
    };
    config.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.key");
        let written = generate_validator_key_to_file(&path).unwrap();
        let read = read_validator_key_file(&path).unwrap();
        assert_eq!(written.public_key_bytes(), read.public_key_bytes());
    }

    #[test]
    fn test_key_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.key");
        std::fs::write(&path, "not-hex").unwrap();
        assert!(read_validator_key_file(&path).is_err());
    }

    #[test]
    fn test_config_template_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        generate_bridge_node_config_template(&path).unwrap();
        let config = BridgeNodeConfig::load(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.committees.len(), 1);
    }
}
