//! Append-only ledger legs.

use crate::{AccountKey, GuildId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why coins moved.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransactionKind {
    /// User-to-user transfer (both legs)
    Transfer,
    /// Daily reward mint
    Daily,
    /// Donation to a community cause
    Donate,
    /// Work payout
    Work,
    /// Game payout
    GameReward,
    /// Starting balance minted at account creation
    Grant,
    /// Shop purchase
    Purchase,
    /// Achievement reward mint
    Achievement,
    /// Balance sunk by a soft reset
    Reset,
}

/// One leg of a ledger movement.
///
/// Exactly one side is set: `from: None` is a mint into `to`, `to: None` is a
/// sink out of `from`. A transfer writes a debit leg and a credit leg that
/// share a `correlation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Leg id
    pub id: Uuid,
    /// Guild the accounts live in
    pub guild_id: GuildId,
    /// Debited user, `None` for a system mint
    pub from: Option<UserId>,
    /// Credited user, `None` for a system sink
    pub to: Option<UserId>,
    /// Always positive
    pub amount: i64,
    /// Why the coins moved
    pub kind: TransactionKind,
    /// Free-form note (transfer message, donation cause, item id)
    pub note: Option<String>,
    /// Links the legs of a multi-leg movement
    pub correlation_id: Option<Uuid>,
    /// When the leg was recorded
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A credit leg minting `amount` into `to`.
    pub fn credit(
        to: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id: to.guild_id,
            from: None,
            to: Some(to.user_id),
            amount,
            kind,
            note,
            correlation_id: None,
            created_at: now,
        }
    }

    /// A debit leg sinking `amount` out of `from`.
    pub fn debit(
        from: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id: from.guild_id,
            from: Some(from.user_id),
            to: None,
            amount,
            kind,
            note,
            correlation_id: None,
            created_at: now,
        }
    }

    /// Attach a correlation id shared with sibling legs.
    pub fn correlated(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Debited account, if any.
    pub fn from_account(&self) -> Option<AccountKey> {
        self.from.map(|user_id| AccountKey {
            guild_id: self.guild_id,
            user_id,
        })
    }

    /// Credited account, if any.
    pub fn to_account(&self) -> Option<AccountKey> {
        self.to.map(|user_id| AccountKey {
            guild_id: self.guild_id,
            user_id,
        })
    }

    /// Signed effect of this leg on `key`'s coin balance.
    pub fn effect_on(&self, key: AccountKey) -> i64 {
        let mut delta = 0;
        if self.to_account() == Some(key) {
            delta += self.amount;
        }
        if self.from_account() == Some(key) {
            delta -= self.amount;
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(TransactionKind::GameReward.as_ref(), "game-reward");
        assert_eq!(
            TransactionKind::from_str("daily").ok(),
            Some(TransactionKind::Daily)
        );
        assert!(TransactionKind::from_str("mint").is_err());
    }

    #[test]
    fn test_effect_on_only_touches_named_side() {
        let alice = AccountKey::new(7u64, 1u64);
        let bob = AccountKey::new(7u64, 2u64);
        let now = Utc::now();

        let out = Transaction::debit(alice, 40, TransactionKind::Transfer, None, now);
        let inc = Transaction::credit(bob, 40, TransactionKind::Transfer, None, now);

        assert_eq!(out.effect_on(alice), -40);
        assert_eq!(out.effect_on(bob), 0);
        assert_eq!(inc.effect_on(bob), 40);
        assert_eq!(inc.from_account(), None);
    }
}
