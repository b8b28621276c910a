// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Multi-window rate limiting over net transfer amounts.
//!
//! Daily and weekly windows are fixed calendar-aligned buckets (unix time
//! divided by the window length), not sliding windows: usage resets at the
//! bucket boundary and closed buckets stay queryable. Checks are evaluated
//! in a fixed order (per-transfer, daily, weekly, cooldown) and usage is
//! recorded only after all of them pass, so a rejected transfer never
//! consumes allowance.
//!
//! Each user gets their own async mutex so concurrent checks for one user
//! serialize without blocking other users. The outer lock only guards entry
//! creation and is never held across an await.

use crate::config::EffectiveLimits;
use crate::error::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use relay_bridge_types::BridgeAddress;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_WEEK: u64 = 604_800;

#[derive(Debug, Default)]
struct UserUsage {
    /// Amount transferred per day bucket (unix seconds / 86_400).
    daily: BTreeMap<u64, u64>,
    /// Amount transferred per week bucket (unix seconds / 604_800).
    weekly: BTreeMap<u64, u64>,
    last_large_transfer_at: Option<u64>,
}

#[derive(Default)]
pub struct TransferLimiter {
    entries: Mutex<HashMap<BridgeAddress, Arc<AsyncMutex<UserUsage>>>>,
}

impl TransferLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, user: &BridgeAddress) -> Arc<AsyncMutex<UserUsage>> {
        self.entries.lock().entry(*user).or_default().clone()
    }

    /// Check `amount` against all windows for `user` and, only if every
    /// check passes, record it as usage at time `now`. On rejection no
    /// counter changes.
    pub async fn check_and_record(
        &self,
        user: &BridgeAddress,
        amount: u64,
        now: u64,
        limits: &EffectiveLimits,
    ) -> BridgeResult<()> {
        let entry = self.entry(user);
        let mut usage = entry.lock().await;

        if amount > limits.max_per_transfer {
            return Err(BridgeError::ExceedsMaxTransfer {
                amount,
                limit: limits.max_per_transfer,
            });
        }

        let day = now / SECONDS_PER_DAY;
        let used_today = usage.daily.get(&day).copied().unwrap_or(0);
        if used_today
            .checked_add(amount)
            .map_or(true, |total| total > limits.daily_limit)
        {
            return Err(BridgeError::ExceedsDailyLimit {
                amount,
                used: used_today,
                limit: limits.daily_limit,
            });
        }

        let week = now / SECONDS_PER_WEEK;
        let used_this_week = usage.weekly.get(&week).copied().unwrap_or(0);
        if used_this_week
            .checked_add(amount)
            .map_or(true, |total| total > limits.weekly_limit)
        {
            return Err(BridgeError::ExceedsWeeklyLimit {
                amount,
                used: used_this_week,
                limit: limits.weekly_limit,
            });
        }

        if amount > limits.large_transfer_threshold {
            if let Some(last) = usage.last_large_transfer_at {
                let elapsed = now.saturating_sub(last);
                if elapsed < limits.cooldown_secs {
                    return Err(BridgeError::CooldownNotElapsed {
                        remaining_secs: limits.cooldown_secs - elapsed,
                    });
                }
            }
        }

        // All checks passed, record.
        *usage.daily.entry(day).or_insert(0) += amount;
        *usage.weekly.entry(week).or_insert(0) += amount;
        if amount > limits.large_transfer_threshold {
            usage.last_large_transfer_at = Some(now);
            info!(%user, amount, "large transfer recorded, cooldown started");
        }
        Ok(())
    }

    /// Undo a recording made by [`check_and_record`](Self::check_and_record)
    /// when the surrounding operation failed afterwards, so a failed attempt
    /// consumes no allowance. Must be called with the same `amount` and
    /// `now`. Clearing the cooldown timestamp is safe: for the recording to
    /// have happened, any earlier cooldown had already elapsed.
    pub async fn rollback(
        &self,
        user: &BridgeAddress,
        amount: u64,
        now: u64,
        limits: &EffectiveLimits,
    ) {
        let entry = self.entry(user);
        let mut usage = entry.lock().await;
        if let Some(used) = usage.daily.get_mut(&(now / SECONDS_PER_DAY)) {
            *used = used.saturating_sub(amount);
        }
        if let Some(used) = usage.weekly.get_mut(&(now / SECONDS_PER_WEEK)) {
            *used = used.saturating_sub(amount);
        }
        if amount > limits.large_transfer_threshold
            && usage.last_large_transfer_at == Some(now)
        {
            usage.last_large_transfer_at = None;
        }
    }

    /// Usage recorded for `user` in the day bucket containing `at`.
    pub async fn transferred_on_day(&self, user: &BridgeAddress, at: u64) -> u64 {
        let entry = self.entry(user);
        let usage = entry.lock().await;
        usage.daily.get(&(at / SECONDS_PER_DAY)).copied().unwrap_or(0)
    }

    /// Usage recorded for `user` in the week bucket containing `at`.
    pub async fn transferred_in_week(&self, user: &BridgeAddress, at: u64) -> u64 {
        let entry = self.entry(user);
        let usage = entry.lock().await;
        usage
            .weekly
            .get(&(at / SECONDS_PER_WEEK))
            .copied()
            .unwrap_or(0)
    }

    pub async fn last_large_transfer_at(&self, user: &BridgeAddress) -> Option<u64> {
        let entry = self.entry(user);
        let usage = entry.lock().await;
        usage.last_large_transfer_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Threshold above max_per_transfer: the window tests never touch the
    // cooldown path.
    fn limits() -> EffectiveLimits {
        EffectiveLimits {
            max_per_transfer: 100,
            daily_limit: 250,
            weekly_limit: 1_500,
            large_transfer_threshold: 150,
            cooldown_secs: 3_600,
        }
    }

    fn cooldown_limits() -> EffectiveLimits {
        EffectiveLimits {
            max_per_transfer: 200,
            daily_limit: 1_000,
            weekly_limit: 5_000,
            large_transfer_threshold: 80,
            cooldown_secs: 3_600,
        }
    }

    #[tokio::test]
    async fn test_max_per_transfer_enforced() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let err = limiter
            .check_and_record(&user, 101, 1_000, &limits())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::ExceedsMaxTransfer {
                amount: 101,
                limit: 100
            }
        );
        // Nothing was recorded.
        assert_eq!(limiter.transferred_on_day(&user, 1_000).await, 0);
    }

    #[tokio::test]
    async fn test_daily_accumulation_and_rejection() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let now = 10 * SECONDS_PER_DAY + 5;
        for _ in 0..2 {
            limiter
                .check_and_record(&user, 100, now, &limits())
                .await
                .unwrap();
        }
        let err = limiter
            .check_and_record(&user, 51, now, &limits())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::ExceedsDailyLimit {
                amount: 51,
                used: 200,
                limit: 250
            }
        );
        // A smaller amount that fits still goes through.
        limiter
            .check_and_record(&user, 50, now, &limits())
            .await
            .unwrap();
        assert_eq!(limiter.transferred_on_day(&user, now).await, 250);
    }

    #[tokio::test]
    async fn test_rejected_attempt_consumes_no_allowance() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let now = 3 * SECONDS_PER_DAY;
        limiter
            .check_and_record(&user, 95, now, &limits())
            .await
            .unwrap();
        // Five rejected attempts at the daily boundary.
        for _ in 0..5 {
            limiter
                .check_and_record(&user, 200, now, &limits())
                .await
                .unwrap_err();
        }
        assert_eq!(limiter.transferred_on_day(&user, now).await, 95);
    }

    #[tokio::test]
    async fn test_daily_window_resets_at_boundary() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let day_n = 20 * SECONDS_PER_DAY + 100;
        // Exhaust the day (250 total).
        limiter
            .check_and_record(&user, 100, day_n, &limits())
            .await
            .unwrap();
        limiter
            .check_and_record(&user, 100, day_n, &limits())
            .await
            .unwrap();
        limiter
            .check_and_record(&user, 50, day_n, &limits())
            .await
            .unwrap();
        limiter
            .check_and_record(&user, 1, day_n, &limits())
            .await
            .unwrap_err();

        // Next calendar day: full allowance again, previous day still
        // queryable.
        let day_n1 = 21 * SECONDS_PER_DAY + 1;
        limiter
            .check_and_record(&user, 100, day_n1, &limits())
            .await
            .unwrap();
        assert_eq!(limiter.transferred_on_day(&user, day_n).await, 250);
        assert_eq!(limiter.transferred_on_day(&user, day_n1).await, 100);
    }

    #[tokio::test]
    async fn test_weekly_ceiling_spans_days() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let generous = EffectiveLimits {
            max_per_transfer: 600,
            daily_limit: 600,
            weekly_limit: 1_500,
            large_transfer_threshold: 10_000,
            cooldown_secs: 0,
        };
        // Week bucket 10 spans days 70..77.
        let week_start = 10 * SECONDS_PER_WEEK;
        for day in 0..3 {
            limiter
                .check_and_record(&user, 500, week_start + day * SECONDS_PER_DAY, &generous)
                .await
                .unwrap();
        }
        // 1500 used; next day of the same week is rejected.
        let err = limiter
            .check_and_record(&user, 1, week_start + 3 * SECONDS_PER_DAY, &generous)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::ExceedsWeeklyLimit {
                amount: 1,
                used: 1_500,
                limit: 1_500
            }
        );
        // Next week bucket starts fresh.
        limiter
            .check_and_record(&user, 500, week_start + SECONDS_PER_WEEK, &generous)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_large_transfer_cooldown() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let now = 40 * SECONDS_PER_DAY;
        // 81 > threshold 80, starts the cooldown.
        limiter
            .check_and_record(&user, 81, now, &cooldown_limits())
            .await
            .unwrap();
        // Another large transfer inside the cooldown is rejected.
        let err = limiter
            .check_and_record(&user, 90, now + 100, &cooldown_limits())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::CooldownNotElapsed {
                remaining_secs: 3_500
            }
        );
        // A small transfer is unaffected by the cooldown.
        limiter
            .check_and_record(&user, 50, now + 100, &cooldown_limits())
            .await
            .unwrap();
        // After the cooldown elapses the next large transfer passes and
        // restarts the clock.
        limiter
            .check_and_record(&user, 90, now + 3_600, &cooldown_limits())
            .await
            .unwrap();
        assert_eq!(
            limiter.last_large_transfer_at(&user).await,
            Some(now + 3_600)
        );
    }

    #[tokio::test]
    async fn test_exactly_threshold_is_not_large() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let now = 50 * SECONDS_PER_DAY;
        limiter
            .check_and_record(&user, 80, now, &cooldown_limits())
            .await
            .unwrap();
        assert_eq!(limiter.last_large_transfer_at(&user).await, None);
    }

    #[tokio::test]
    async fn test_rollback_releases_recorded_usage() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let now = 55 * SECONDS_PER_DAY;
        limiter
            .check_and_record(&user, 100, now, &limits())
            .await
            .unwrap();
        limiter.rollback(&user, 100, now, &limits()).await;
        assert_eq!(limiter.transferred_on_day(&user, now).await, 0);
        assert_eq!(limiter.transferred_in_week(&user, now).await, 0);

        // A rolled-back large transfer does not leave its cooldown behind.
        limiter
            .check_and_record(&user, 81, now, &cooldown_limits())
            .await
            .unwrap();
        limiter.rollback(&user, 81, now, &cooldown_limits()).await;
        assert_eq!(limiter.last_large_transfer_at(&user).await, None);
        limiter
            .check_and_record(&user, 90, now + 1, &cooldown_limits())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let limiter = TransferLimiter::new();
        let alice = BridgeAddress::random_for_testing();
        let bob = BridgeAddress::random_for_testing();
        let now = 60 * SECONDS_PER_DAY;
        for _ in 0..2 {
            limiter
                .check_and_record(&alice, 100, now, &limits())
                .await
                .unwrap();
        }
        limiter
            .check_and_record(&alice, 100, now, &limits())
            .await
            .unwrap_err();
        // Bob's allowance is untouched by Alice's usage.
        limiter
            .check_and_record(&bob, 100, now, &limits())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_overflowing_usage_rejected() {
        let limiter = TransferLimiter::new();
        let user = BridgeAddress::random_for_testing();
        let huge = EffectiveLimits {
            max_per_transfer: u64::MAX,
            daily_limit: u64::MAX,
            weekly_limit: u64::MAX,
            large_transfer_threshold: u64::MAX,
            cooldown_secs: 0,
        };
        let now = 70 * SECONDS_PER_DAY;
        limiter
            .check_and_record(&user, u64::MAX, now, &huge)
            .await
            .unwrap();
        // Any further amount would overflow the day counter; treated as
        // exceeding the limit rather than wrapping.
        let err = limiter
            .check_and_record(&user, 1, now, &huge)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ExceedsDailyLimit { .. }));
    }
}
