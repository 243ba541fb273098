//! The ledger engine.

use crate::{AccountLocks, EconomyError, EconomyErrorKind, EconomyResult, LedgerBatch};
use chrono::{DateTime, Utc};
use ilm_core::{
    Account, AccountKey, AchievementUnlock, EconomyConfig, GuildId, IlmConfig, InventoryEntry,
    LeaderboardEntry, LeaderboardMetric, ShopCatalog, ShopItem, Transaction, TransactionKind,
};
use ilm_storage::AccountStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, error, info, instrument, warn};

/// Largest leaderboard page.
pub const MAX_LEADERBOARD: usize = 20;

/// Community cause a donation supports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum DonationCause {
    /// General charity
    #[default]
    General,
    /// Islamic education
    Education,
    /// Helping the needy
    Charity,
    /// Community development
    Community,
}

/// Result of a transfer.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Leg out of the sender
    pub debit: Transaction,
    /// Leg into the receiver
    pub credit: Transaction,
    /// Sender after the transfer
    pub sender: Account,
    /// Receiver after the transfer
    pub receiver: Account,
}

/// Result of a donation.
#[derive(Debug, Clone)]
pub struct Donation {
    /// The donation leg
    pub transaction: Transaction,
    /// Good deed points earned
    pub points_awarded: i64,
    /// Donor after the donation
    pub account: Account,
}

/// Result of a shop purchase.
#[derive(Debug, Clone)]
pub struct Purchase {
    /// The purchase leg
    pub transaction: Transaction,
    /// Item bought
    pub item: ShopItem,
    /// Buyer after the purchase
    pub account: Account,
}

/// Output of a committed mutation.
#[derive(Debug)]
pub(crate) struct Settled<T> {
    pub(crate) value: T,
    accounts: BTreeMap<AccountKey, Account>,
}

impl<T> Settled<T> {
    /// Account as stored after the commit.
    pub(crate) fn account(&mut self, key: AccountKey) -> EconomyResult<Account> {
        self.accounts
            .remove(&key)
            .ok_or_else(|| EconomyError::new(EconomyErrorKind::UnknownAccount(key)))
    }
}

/// Ledger engine: every coin movement goes through here.
///
/// Mutations lock the touched accounts in-process, load them into a
/// [`LedgerBatch`], apply the operation and commit the batch as one
/// compare-and-swap. A lost race reloads and re-applies the operation up to
/// `max_commit_attempts` times.
pub struct Ledger {
    store: Arc<dyn AccountStore>,
    config: EconomyConfig,
    shop: ShopCatalog,
    locks: AccountLocks,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("shop_items", &self.shop.items.len())
            .field("locked_keys", &self.locks.len())
            .finish()
    }
}

impl Ledger {
    /// Create a ledger over a store.
    pub fn new(store: Arc<dyn AccountStore>, config: EconomyConfig, shop: ShopCatalog) -> Self {
        Self {
            store,
            config,
            shop,
            locks: AccountLocks::new(),
        }
    }

    /// Create a ledger from the bot configuration.
    pub fn from_config(store: Arc<dyn AccountStore>, config: &IlmConfig) -> Self {
        Self::new(store, config.economy().clone(), config.shop().clone())
    }

    /// Economy constants.
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Shop catalog.
    pub fn shop(&self) -> &ShopCatalog {
        &self.shop
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Run `op` against freshly loaded accounts and commit its writes.
    pub(crate) async fn mutate<T, F>(
        &self,
        keys: &[AccountKey],
        now: DateTime<Utc>,
        with_holdings: bool,
        op: F,
    ) -> EconomyResult<Settled<T>>
    where
        F: Fn(&mut LedgerBatch<'_>) -> EconomyResult<T> + Send + Sync,
        T: Send,
    {
        let _guards = self.locks.acquire(keys).await;

        let retries = self.config.max_commit_attempts().saturating_sub(1) as usize;
        let strategy = ExponentialBackoff::from_millis(5)
            .factor(2)
            .max_delay(Duration::from_millis(250))
            .map(jitter)
            .take(retries);

        let op = &op;
        let result = Retry::spawn(strategy, move || async move {
            match self.attempt(keys, now, with_holdings, op).await {
                Ok(settled) => Ok(settled),
                Err(e) if e.is_conflict() => {
                    warn!(error = %e, "Commit conflict, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => Err(RetryError::Permanent(e)),
            }
        })
        .await;

        result.map_err(|e| {
            if e.is_conflict() {
                error!(attempts = retries + 1, "Commit retries exhausted");
                EconomyError::new(EconomyErrorKind::StorageUnavailable(
                    "too many concurrent writers".to_string(),
                ))
            } else {
                e
            }
        })
    }

    async fn attempt<T, F>(
        &self,
        keys: &[AccountKey],
        now: DateTime<Utc>,
        with_holdings: bool,
        op: &F,
    ) -> EconomyResult<Settled<T>>
    where
        F: Fn(&mut LedgerBatch<'_>) -> EconomyResult<T> + Send + Sync,
        T: Send,
    {
        let mut batch =
            LedgerBatch::load(self.store.as_ref(), &self.config, keys, now, with_holdings).await?;
        let value = op(&mut batch)?;
        let (commit, mut accounts) = batch.into_parts();

        if !commit.is_empty() {
            for stored in self.store.commit(commit).await? {
                accounts.insert(stored.key(), stored);
            }
        }

        Ok(Settled { value, accounts })
    }

    /// Mint coins into an account.
    ///
    /// Reserved for internal reward logic; no user command reaches it.
    #[instrument(skip(self, note), fields(%key, amount, %kind))]
    pub async fn credit(
        &self,
        key: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
    ) -> EconomyResult<Transaction> {
        let settled = self
            .mutate(&[key], Utc::now(), false, |batch| {
                batch.credit(key, amount, kind, note.clone())
            })
            .await?;
        info!(tx = %settled.value.id, "Credited account");
        Ok(settled.value)
    }

    /// Sink coins out of an account.
    #[instrument(skip(self, note), fields(%key, amount, %kind))]
    pub async fn debit(
        &self,
        key: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
    ) -> EconomyResult<Transaction> {
        let settled = self
            .mutate(&[key], Utc::now(), false, |batch| {
                batch.debit(key, amount, kind, note.clone())
            })
            .await?;
        info!(tx = %settled.value.id, "Debited account");
        Ok(settled.value)
    }

    /// Move coins between two members of the same guild.
    #[instrument(skip(self, note), fields(%from, %to, amount))]
    pub async fn transfer(
        &self,
        from: AccountKey,
        to: AccountKey,
        amount: i64,
        note: Option<String>,
    ) -> EconomyResult<Transfer> {
        if !*self.config.transfer_enabled() {
            return Err(EconomyError::new(EconomyErrorKind::TransfersDisabled));
        }
        check_bounds(
            amount,
            *self.config.min_transfer(),
            *self.config.max_transfer(),
        )?;
        if from == to {
            return Err(EconomyError::new(EconomyErrorKind::SameAccount));
        }
        debug!("Transfer passed validation");

        let mut settled = self
            .mutate(&[from, to], Utc::now(), false, |batch| {
                batch.transfer(from, to, amount, note.clone())
            })
            .await?;

        let (debit, credit) = settled.value.clone();
        let transfer = Transfer {
            debit,
            credit,
            sender: settled.account(from)?,
            receiver: settled.account(to)?,
        };
        info!(
            correlation_id = ?transfer.debit.correlation_id,
            sender_balance = transfer.sender.coin_balance,
            "Transfer committed"
        );
        Ok(transfer)
    }

    /// Donate coins to a cause in exchange for good deed points.
    #[instrument(skip(self), fields(%key, amount, %cause))]
    pub async fn donate(
        &self,
        key: AccountKey,
        amount: i64,
        cause: DonationCause,
    ) -> EconomyResult<Donation> {
        check_bounds(
            amount,
            *self.config.min_donation(),
            *self.config.max_donation(),
        )?;
        let points = self.config.points_for_donation(amount);

        let mut settled = self
            .mutate(&[key], Utc::now(), false, |batch| {
                let leg = batch.debit(
                    key,
                    amount,
                    TransactionKind::Donate,
                    Some(cause.to_string()),
                )?;
                batch.update(key, |account| {
                    account.total_donated += amount;
                    account.good_deed_points += points;
                })?;
                Ok(leg)
            })
            .await?;

        let donation = Donation {
            transaction: settled.value.clone(),
            points_awarded: points,
            account: settled.account(key)?,
        };
        info!(points, "Donation committed");
        Ok(donation)
    }

    /// Buy a shop item.
    #[instrument(skip(self), fields(%key, item_id))]
    pub async fn purchase(&self, key: AccountKey, item_id: &str) -> EconomyResult<Purchase> {
        let item = self
            .shop
            .get(item_id)
            .cloned()
            .ok_or_else(|| EconomyError::new(EconomyErrorKind::UnknownItem(item_id.to_string())))?;

        let mut settled = self
            .mutate(&[key], Utc::now(), false, |batch| {
                let leg = batch.debit(
                    key,
                    item.price,
                    TransactionKind::Purchase,
                    Some(item.id.clone()),
                )?;
                batch.grant_item(key, &item.id, 1);
                batch.award_points(key, item.good_deed_points)?;
                Ok(leg)
            })
            .await?;

        let purchase = Purchase {
            transaction: settled.value.clone(),
            account: settled.account(key)?,
            item,
        };
        info!(price = purchase.item.price, "Purchase committed");
        Ok(purchase)
    }

    /// Soft reset: sink the balance and clear points, streak and daily claim.
    ///
    /// Lifetime totals are kept. Returns the reset leg, if there was a balance
    /// to sink.
    #[instrument(skip(self), fields(%key))]
    pub async fn reset(&self, key: AccountKey) -> EconomyResult<Option<Transaction>> {
        let settled = self
            .mutate(&[key], Utc::now(), false, |batch| {
                let balance = batch.account(key)?.coin_balance;
                let leg = if balance > 0 {
                    // Reset sinks are not spending
                    let leg = batch.debit(key, balance, TransactionKind::Reset, None)?;
                    batch.update(key, |account| account.total_spent -= balance)?;
                    Some(leg)
                } else {
                    None
                };
                batch.update(key, |account| {
                    account.good_deed_points = 0;
                    account.daily_streak = 0;
                    account.last_daily_claim = None;
                })?;
                Ok(leg)
            })
            .await?;
        info!("Account reset");
        Ok(settled.value)
    }

    /// Current account state, opening the account on first sight.
    #[instrument(skip(self), fields(%key))]
    pub async fn balance(&self, key: AccountKey) -> EconomyResult<Account> {
        if let Some(account) = self.store.get(key).await? {
            return Ok(account);
        }
        let mut settled = self.mutate(&[key], Utc::now(), false, |_| Ok(())).await?;
        settled.account(key)
    }

    /// Current account state without opening it.
    ///
    /// An account that was never opened is shown as it would look once
    /// opened; nothing is written.
    #[instrument(skip(self), fields(%key))]
    pub async fn peek(&self, key: AccountKey) -> EconomyResult<Account> {
        if let Some(account) = self.store.get(key).await? {
            return Ok(account);
        }
        debug!("Account not opened yet");
        let mut account = Account::new(key, Utc::now());
        account.coin_balance = *self.config.starting_balance();
        Ok(account)
    }

    /// Most recent legs touching an account, newest first.
    pub async fn history(&self, key: AccountKey, limit: usize) -> EconomyResult<Vec<Transaction>> {
        Ok(self.store.transactions(key, limit).await?)
    }

    /// Top accounts of a guild. `limit` is clamped to `1..=20`.
    pub async fn leaderboard(
        &self,
        guild_id: GuildId,
        metric: LeaderboardMetric,
        limit: usize,
    ) -> EconomyResult<Vec<LeaderboardEntry>> {
        let limit = limit.clamp(1, MAX_LEADERBOARD);
        Ok(self.store.leaderboard(guild_id, metric, limit).await?)
    }

    /// Items owned by an account.
    pub async fn inventory(&self, key: AccountKey) -> EconomyResult<Vec<InventoryEntry>> {
        Ok(self.store.inventory(key).await?)
    }

    /// Achievements unlocked by an account.
    pub async fn achievements(&self, key: AccountKey) -> EconomyResult<Vec<AchievementUnlock>> {
        Ok(self.store.achievements(key).await?)
    }
}

fn check_bounds(amount: i64, min: i64, max: i64) -> EconomyResult<()> {
    if amount < min || amount > max {
        debug!(amount, min, max, "Amount out of bounds");
        return Err(EconomyError::new(EconomyErrorKind::InvalidAmount(format!(
            "must be between {} and {}",
            min, max
        ))));
    }
    Ok(())
}
