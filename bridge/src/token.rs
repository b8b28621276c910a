// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Token custody bookkeeping. For each supported token the manager tracks
//! how much is locked in custody and how much wrapped supply it has minted;
//! in quiescence the two must match. A release that would overdraw custody
//! is a fatal accounting violation: it halts further releases for that token
//! instead of being retried.

use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use relay_bridge_types::{BridgeAddress, ChainId, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// A supported token as declared in config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TokenMeta {
    pub token: TokenId,
    pub symbol: String,
    /// The chain this token is native to. Transfers out of the origin chain
    /// lock and mint; transfers back burn and release.
    pub origin_chain: ChainId,
}

/// Asset movements the manager performs. Implemented against the real
/// settlement layer in production and an in-memory ledger in tests.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn transfer(
        &self,
        token: TokenId,
        from: &BridgeAddress,
        to: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()>;
    async fn mint(&self, token: TokenId, to: &BridgeAddress, amount: u64) -> BridgeResult<()>;
    async fn burn(&self, token: TokenId, from: &BridgeAddress, amount: u64) -> BridgeResult<()>;
    async fn balance_of(&self, token: TokenId, owner: &BridgeAddress) -> u64;
}

/// Simple balance-map ledger.
#[derive(Default)]
pub struct InMemoryLedger {
    balances: parking_lot::Mutex<HashMap<(TokenId, BridgeAddress), u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&self, token: TokenId, owner: &BridgeAddress, amount: u64) {
        *self.balances.lock().entry((token, *owner)).or_insert(0) += amount;
    }
}

#[async_trait]
impl TokenLedger for InMemoryLedger {
    async fn transfer(
        &self,
        token: TokenId,
        from: &BridgeAddress,
        to: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()> {
        let mut balances = self.balances.lock();
        let from_balance = balances.get(&(token, *from)).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(BridgeError::InsufficientBalance);
        }
        balances.insert((token, *from), from_balance - amount);
        *balances.entry((token, *to)).or_insert(0) += amount;
        Ok(())
    }

    async fn mint(&self, token: TokenId, to: &BridgeAddress, amount: u64) -> BridgeResult<()> {
        *self.balances.lock().entry((token, *to)).or_insert(0) += amount;
        Ok(())
    }

    async fn burn(&self, token: TokenId, from: &BridgeAddress, amount: u64) -> BridgeResult<()> {
        let mut balances = self.balances.lock();
        let balance = balances.get(&(token, *from)).copied().unwrap_or(0);
        if balance < amount {
            return Err(BridgeError::InsufficientBalance);
        }
        balances.insert((token, *from), balance - amount);
        Ok(())
    }

    async fn balance_of(&self, token: TokenId, owner: &BridgeAddress) -> u64 {
        self.balances
            .lock()
            .get(&(token, *owner))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TokenBooks {
    pub total_locked: u64,
    pub total_minted: u64,
    pub halted: bool,
}

pub struct TokenManager {
    ledger: Arc<dyn TokenLedger>,
    custody_address: BridgeAddress,
    tokens: BTreeMap<TokenId, TokenMeta>,
    // One async lock for all books: custody checks and the matching ledger
    // movement must be atomic with respect to each other.
    books: Mutex<HashMap<TokenId, TokenBooks>>,
}

impl TokenManager {
    pub fn new(
        ledger: Arc<dyn TokenLedger>,
        custody_address: BridgeAddress,
        tokens: Vec<TokenMeta>,
    ) -> Self {
        let tokens = tokens.into_iter().map(|t| (t.token, t)).collect();
        Self {
            ledger,
            custody_address,
            tokens,
            books: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    pub fn custody_address(&self) -> &BridgeAddress {
        &self.custody_address
    }

    pub fn token_meta(&self, token: TokenId) -> BridgeResult<&TokenMeta> {
        self.tokens.get(&token).ok_or(BridgeError::UnknownToken(token))
    }

    pub async fn books(&self, token: TokenId) -> TokenBooks {
        self.books
            .lock()
            .await
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    pub async fn all_books(&self) -> HashMap<TokenId, TokenBooks> {
        self.books.lock().await.clone()
    }

    /// The quiescent-state check: with no transfer awaiting proof, every
    /// token's custody must match its minted supply.
    pub async fn is_balanced(&self) -> bool {
        self.books
            .lock()
            .await
            .values()
            .all(|books| books.total_locked == books.total_minted)
    }

    pub async fn balance_of(&self, token: TokenId, owner: &BridgeAddress) -> u64 {
        self.ledger.balance_of(token, owner).await
    }

    /// Move `amount` from `from` into custody.
    pub async fn lock(
        &self,
        token: TokenId,
        from: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()> {
        self.token_meta(token)?;
        let mut books = self.books.lock().await;
        self.ledger
            .transfer(token, from, &self.custody_address, amount)
            .await?;
        books.entry(token).or_default().total_locked += amount;
        Ok(())
    }

    /// Release `amount` from custody to `to`. Overdrawing custody is a
    /// fatal accounting violation that halts further releases for `token`.
    pub async fn release(
        &self,
        token: TokenId,
        to: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()> {
        self.token_meta(token)?;
        let mut books = self.books.lock().await;
        let entry = books.entry(token).or_default();
        if entry.halted {
            return Err(BridgeError::InsolvencyViolation {
                token,
                custody: entry.total_locked,
                requested: amount,
            });
        }
        if entry.total_locked < amount {
            entry.halted = true;
            error!(
                %token,
                custody = entry.total_locked,
                requested = amount,
                "custody cannot cover release, halting token"
            );
            return Err(BridgeError::InsolvencyViolation {
                token,
                custody: entry.total_locked,
                requested: amount,
            });
        }
        self.ledger
            .transfer(token, &self.custody_address, to, amount)
            .await?;
        entry.total_locked -= amount;
        Ok(())
    }

    /// Mint `amount` of wrapped supply to `to`.
    pub async fn mint(&self, token: TokenId, to: &BridgeAddress, amount: u64) -> BridgeResult<()> {
        self.token_meta(token)?;
        let mut books = self.books.lock().await;
        self.ledger.mint(token, to, amount).await?;
        books.entry(token).or_default().total_minted += amount;
        Ok(())
    }

    /// Burn `amount` of wrapped supply held by `from`.
    pub async fn burn(
        &self,
        token: TokenId,
        from: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()> {
        self.token_meta(token)?;
        let mut books = self.books.lock().await;
        let entry = books.entry(token).or_default();
        if entry.total_minted < amount {
            entry.halted = true;
            error!(
                %token,
                minted = entry.total_minted,
                requested = amount,
                "burn exceeds recorded minted supply, halting token"
            );
            return Err(BridgeError::InsolvencyViolation {
                token,
                custody: entry.total_minted,
                requested: amount,
            });
        }
        self.ledger.burn(token, from, amount).await?;
        entry.total_minted -= amount;
        Ok(())
    }

    /// Fee transfer straight from the user to the collector, bypassing
    /// custody books.
    pub async fn collect_fee(
        &self,
        token: TokenId,
        from: &BridgeAddress,
        collector: &BridgeAddress,
        amount: u64,
    ) -> BridgeResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.token_meta(token)?;
        self.ledger.transfer(token, from, collector, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_funds(user: &BridgeAddress, amount: u64) -> TokenManager {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.credit(TokenId(1), user, amount);
        TokenManager::new(
            ledger,
            BridgeAddress::random_for_testing(),
            vec![TokenMeta {
                token: TokenId(1),
                symbol: "STC".to_string(),
                origin_chain: ChainId(1),
            }],
        )
    }

    #[tokio::test]
    async fn test_lock_then_release_round_trip() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 1_000);
        manager.lock(TokenId(1), &user, 400).await.unwrap();
        assert_eq!(manager.books(TokenId(1)).await.total_locked, 400);
        assert_eq!(
            manager
                .balance_of(TokenId(1), manager.custody_address())
                .await,
            400
        );

        let recipient = BridgeAddress::random_for_testing();
        manager.release(TokenId(1), &recipient, 400).await.unwrap();
        assert_eq!(manager.books(TokenId(1)).await.total_locked, 0);
        assert_eq!(manager.balance_of(TokenId(1), &recipient).await, 400);
    }

    #[tokio::test]
    async fn test_release_overdraw_halts_token() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 1_000);
        manager.lock(TokenId(1), &user, 100).await.unwrap();

        let recipient = BridgeAddress::random_for_testing();
        let err = manager
            .release(TokenId(1), &recipient, 101)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(manager.books(TokenId(1)).await.halted);

        // Even a coverable release is refused once halted.
        let err = manager
            .release(TokenId(1), &recipient, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InsolvencyViolation { .. }));
        // Custody itself was never touched.
        assert_eq!(
            manager
                .balance_of(TokenId(1), manager.custody_address())
                .await,
            100
        );
    }

    #[tokio::test]
    async fn test_mint_and_burn_track_supply() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 0);
        manager.mint(TokenId(1), &user, 300).await.unwrap();
        assert_eq!(manager.books(TokenId(1)).await.total_minted, 300);
        manager.burn(TokenId(1), &user, 120).await.unwrap();
        assert_eq!(manager.books(TokenId(1)).await.total_minted, 180);
        assert_eq!(manager.balance_of(TokenId(1), &user).await, 180);
    }

    #[tokio::test]
    async fn test_burn_beyond_minted_is_fatal() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 500);
        manager.mint(TokenId(1), &user, 100).await.unwrap();
        let err = manager.burn(TokenId(1), &user, 101).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 100);
        let err = manager.lock(TokenId(9), &user, 10).await.unwrap_err();
        assert_eq!(err, BridgeError::UnknownToken(TokenId(9)));
    }

    #[tokio::test]
    async fn test_insufficient_balance_changes_nothing() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 50);
        let err = manager.lock(TokenId(1), &user, 51).await.unwrap_err();
        assert_eq!(err, BridgeError::InsufficientBalance);
        assert_eq!(manager.books(TokenId(1)).await.total_locked, 0);
        assert_eq!(manager.balance_of(TokenId(1), &user).await, 50);
    }

    #[tokio::test]
    async fn test_collect_fee_bypasses_custody() {
        let user = BridgeAddress::random_for_testing();
        let manager = manager_with_funds(&user, 100);
        let collector = BridgeAddress::random_for_testing();
        manager
            .collect_fee(TokenId(1), &user, &collector, 3)
            .await
            .unwrap();
        assert_eq!(manager.balance_of(TokenId(1), &collector).await, 3);
        assert_eq!(manager.books(TokenId(1)).await.total_locked, 0);
    }
}
