// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Node configuration and the governance-controlled runtime parameters.
//!
//! `BridgeNodeConfig` is the on-disk shape loaded at startup. `AdminParams`
//! is the validated runtime snapshot the engine reads on every operation;
//! governance changes replace the whole snapshot atomically, so a parameter
//! change applies to the next evaluation and never retroactively alters a
//! transfer already past its checks.

use crate::error::{BridgeError, BridgeResult};
use crate::token::TokenMeta;
use relay_bridge_config::Config;
use relay_bridge_types::{
    BridgeAddress, ChainId, CommitteeMember, ValidatorCommittee, ValidatorPublicKeyBytes,
};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::BTreeMap;

pub const MAX_FEE_BPS: u64 = 10_000;

/// Global transfer limits, the defaults for any user without a per-user
/// override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeLimitsConfig {
    pub max_per_transfer: u64,
    pub daily_limit: u64,
    pub weekly_limit: u64,
    /// Transfers strictly above this trigger the per-user cooldown.
    pub large_transfer_threshold: u64,
    pub default_cooldown_secs: u64,
}

/// Per-user limit override, set by governance. `is_limited` false means the
/// entry is inert and global defaults apply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserLimits {
    pub max_per_transfer: u64,
    pub daily_limit: u64,
    pub weekly_limit: u64,
    /// Zero means "inherit the default cooldown".
    pub cooldown_secs: u64,
    pub is_limited: bool,
}

/// The limits actually applied to one user for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveLimits {
    pub max_per_transfer: u64,
    pub daily_limit: u64,
    pub weekly_limit: u64,
    pub large_transfer_threshold: u64,
    pub cooldown_secs: u64,
}

/// Governance-controlled snapshot consumed by the engine. Mutations
/// clone-and-swap; readers keep the snapshot they loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminParams {
    pub limits: BridgeLimitsConfig,
    pub user_limits: BTreeMap<BridgeAddress, UserLimits>,
    /// Fee in basis points, deducted up front and exempt from rate limits.
    pub fee_bps: u64,
    pub fee_collector: BridgeAddress,
    /// A transfer still awaiting proof past this window expires lazily.
    pub transfer_expiry_secs: u64,
}

impl AdminParams {
    pub fn effective_limits(&self, user: &BridgeAddress) -> EffectiveLimits {
        let defaults = &self.limits;
        match self.user_limits.get(user).filter(|u| u.is_limited) {
            Some(user_limits) => EffectiveLimits {
                max_per_transfer: user_limits.max_per_transfer,
                daily_limit: user_limits.daily_limit,
                weekly_limit: user_limits.weekly_limit,
                large_transfer_threshold: defaults.large_transfer_threshold,
                cooldown_secs: if user_limits.cooldown_secs != 0 {
                    user_limits.cooldown_secs
                } else {
                    defaults.default_cooldown_secs
                },
            },
            None => EffectiveLimits {
                max_per_transfer: defaults.max_per_transfer,
                daily_limit: defaults.daily_limit,
                weekly_limit: defaults.weekly_limit,
                large_transfer_threshold: defaults.large_transfer_threshold,
                cooldown_secs: defaults.default_cooldown_secs,
            },
        }
    }
}

/// One validator entry in the on-disk config.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidatorConfig {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: ValidatorPublicKeyBytes,
    pub name: String,
}

/// Committee for one chain in the on-disk config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommitteeConfig {
    pub chain: ChainId,
    pub min_validators: u16,
    pub validators: Vec<ValidatorConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeNodeConfig {
    /// The port the request server listens on; metrics are served from the
    /// same router under `/metrics`.
    pub server_listen_port: u16,
    /// Addresses allowed to perform governance operations.
    pub admin_addresses: Vec<BridgeAddress>,
    /// The address holding locked funds on the ledger.
    pub custody_address: BridgeAddress,
    /// The chain this node settles on.
    pub local_chain: ChainId,
    pub fee_bps: u64,
    pub fee_collector: BridgeAddress,
    pub transfer_expiry_secs: u64,
    pub limits: BridgeLimitsConfig,
    #[serde(default)]
    pub user_limits: BTreeMap<BridgeAddress, UserLimits>,
    pub tokens: Vec<TokenMeta>,
    pub committees: Vec<CommitteeConfig>,
}

impl Config for BridgeNodeConfig {}

impl BridgeNodeConfig {
    /// Validate the raw config into runtime pieces: governance params and
    /// per-chain committees.
    pub fn validate(&self) -> BridgeResult<(AdminParams, BTreeMap<ChainId, ValidatorCommittee>)> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(BridgeError::ConfigError(format!(
                "fee-bps {} exceeds {}",
                self.fee_bps, MAX_FEE_BPS
            )));
        }
        if self.fee_bps > 0 && self.fee_collector.is_zero() {
            return Err(BridgeError::ConfigError(
                "fee-collector must be set when fee-bps is nonzero".to_string(),
            ));
        }
        if self.admin_addresses.is_empty() {
            return Err(BridgeError::ConfigError(
                "at least one admin address is required".to_string(),
            ));
        }
        if self.admin_addresses.iter().any(BridgeAddress::is_zero) {
            return Err(BridgeError::ConfigError(
                "admin address must not be the zero address".to_string(),
            ));
        }
        if self.custody_address.is_zero() {
            return Err(BridgeError::ConfigError(
                "custody address must not be the zero address".to_string(),
            ));
        }

        let mut committees = BTreeMap::new();
        for committee_config in &self.committees {
            let members: Vec<_> = committee_config
                .validators
                .iter()
                .map(|v| CommitteeMember::new(v.public_key, v.name.clone()))
                .collect();
            let committee = ValidatorCommittee::new(members, committee_config.min_validators)
                .map_err(|e| {
                    BridgeError::ConfigError(format!(
                        "committee for chain {}: {e}",
                        committee_config.chain
                    ))
                })?;
            if committees
                .insert(committee_config.chain, committee)
                .is_some()
            {
                return Err(BridgeError::ConfigError(format!(
                    "duplicate committee for chain {}",
                    committee_config.chain
                )));
            }
        }

        let params = AdminParams {
            limits: self.limits.clone(),
            user_limits: self.user_limits.clone(),
            fee_bps: self.fee_bps,
            fee_collector: self.fee_collector,
            transfer_expiry_secs: self.transfer_expiry_secs,
        };
        Ok((params, committees))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_limits, test_node_config};
    use relay_bridge_config::Config;

    #[test]
    fn test_effective_limits_fall_back_to_defaults() {
        let params = AdminParams {
            limits: test_limits(),
            user_limits: BTreeMap::new(),
            fee_bps: 0,
            fee_collector: BridgeAddress::ZERO,
            transfer_expiry_secs: 3600,
        };
        let user = BridgeAddress::random_for_testing();
        let effective = params.effective_limits(&user);
        assert_eq!(effective.max_per_transfer, params.limits.max_per_transfer);
        assert_eq!(effective.daily_limit, params.limits.daily_limit);
    }

    #[test]
    fn test_user_override_applies_only_when_limited() {
        let user = BridgeAddress::random_for_testing();
        let mut params = AdminParams {
            limits: test_limits(),
            user_limits: BTreeMap::new(),
            fee_bps: 0,
            fee_collector: BridgeAddress::ZERO,
            transfer_expiry_secs: 3600,
        };
        params.user_limits.insert(
            user,
            UserLimits {
                max_per_transfer: 10,
                daily_limit: 20,
                weekly_limit: 30,
                cooldown_secs: 0,
                is_limited: false,
            },
        );
        // Inert entry: defaults still apply.
        assert_eq!(
            params.effective_limits(&user).max_per_transfer,
            params.limits.max_per_transfer
        );

        params.user_limits.get_mut(&user).unwrap().is_limited = true;
        let effective = params.effective_limits(&user);
        assert_eq!(effective.max_per_transfer, 10);
        assert_eq!(effective.daily_limit, 20);
        assert_eq!(effective.weekly_limit, 30);
        // Zero user cooldown inherits the default.
        assert_eq!(effective.cooldown_secs, test_limits().default_cooldown_secs);
    }

    #[test]
    fn test_config_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        let config = test_node_config();
        config.save(&path).unwrap();
        let loaded = BridgeNodeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_excessive_fee() {
        let mut config = test_node_config();
        config.fee_bps = MAX_FEE_BPS + 1;
        assert!(matches!(
            config.validate().unwrap_err(),
            BridgeError::ConfigError(_)
        ));
    }

    #[test]
    fn test_validate_rejects_fee_without_collector() {
        let mut config = test_node_config();
        config.fee_bps = 25;
        config.fee_collector = BridgeAddress::ZERO;
        assert!(matches!(
            config.validate().unwrap_err(),
            BridgeError::ConfigError(_)
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_committee() {
        let mut config = test_node_config();
        let duplicate = config.committees[0].clone();
        config.committees.push(duplicate);
        assert!(matches!(
            config.validate().unwrap_err(),
            BridgeError::ConfigError(_)
        ));
    }
}
