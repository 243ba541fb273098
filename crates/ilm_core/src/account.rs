//! Per-guild user accounts.

use crate::{AccountKey, GuildId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Balance sheet and activity statistics for one user in one guild.
///
/// Accounts are created lazily on first interaction and never deleted. The
/// `revision` counter is the compare-and-swap token: zero means the account
/// has not been persisted yet, and every successful write bumps it by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Guild the account lives in
    pub guild_id: GuildId,
    /// Owner of the account
    pub user_id: UserId,
    /// Spendable Ilm Coins
    pub coin_balance: i64,
    /// Prestige currency, earned through donations, items and achievements
    pub good_deed_points: i64,
    /// Lifetime coins received
    pub total_earned: i64,
    /// Lifetime coins spent (debits of any kind)
    pub total_spent: i64,
    /// Lifetime coins donated
    pub total_donated: i64,
    /// Consecutive daily claims inside the grace window
    pub daily_streak: i32,
    /// When the daily reward was last claimed
    pub last_daily_claim: Option<DateTime<Utc>>,
    /// Games that paid out a reward
    pub games_played: i32,
    /// Compare-and-swap token
    pub revision: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A fresh, unpersisted account with everything at zero.
    pub fn new(key: AccountKey, now: DateTime<Utc>) -> Self {
        Self {
            guild_id: key.guild_id,
            user_id: key.user_id,
            coin_balance: 0,
            good_deed_points: 0,
            total_earned: 0,
            total_spent: 0,
            total_donated: 0,
            daily_streak: 0,
            last_daily_claim: None,
            games_played: 0,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The account's identity.
    pub fn key(&self) -> AccountKey {
        AccountKey {
            guild_id: self.guild_id,
            user_id: self.user_id,
        }
    }

    /// Whether the account exists in the store.
    pub fn is_persisted(&self) -> bool {
        self.revision > 0
    }
}
