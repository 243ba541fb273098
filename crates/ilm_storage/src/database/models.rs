//! Row types and their conversions to the domain model.

use super::schema::{accounts, achievement_unlocks, inventory, ledger_transactions};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use ilm_core::{
    Account, AchievementUnlock, GuildId, InventoryEntry, Transaction, TransactionKind, UserId,
};
use ilm_error::{StorageError, StorageErrorKind, StorageResult};
use std::str::FromStr;
use uuid::Uuid;

/// A row of the `accounts` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = accounts)]
#[diesel(primary_key(guild_id, user_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountRow {
    pub guild_id: i64,
    pub user_id: i64,
    pub coin_balance: i64,
    pub good_deed_points: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub total_donated: i64,
    pub daily_streak: i32,
    pub last_daily_claim: Option<DateTime<Utc>>,
    pub games_played: i32,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            guild_id: account.guild_id.to_db(),
            user_id: account.user_id.to_db(),
            coin_balance: account.coin_balance,
            good_deed_points: account.good_deed_points,
            total_earned: account.total_earned,
            total_spent: account.total_spent,
            total_donated: account.total_donated,
            daily_streak: account.daily_streak,
            last_daily_claim: account.last_daily_claim,
            games_played: account.games_played,
            revision: account.revision,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            guild_id: GuildId::from_db(row.guild_id),
            user_id: UserId::from_db(row.user_id),
            coin_balance: row.coin_balance,
            good_deed_points: row.good_deed_points,
            total_earned: row.total_earned,
            total_spent: row.total_spent,
            total_donated: row.total_donated,
            daily_streak: row.daily_streak,
            last_daily_claim: row.last_daily_claim,
            games_played: row.games_played,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row of the `ledger_transactions` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = ledger_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionRow {
    pub id: Uuid,
    pub guild_id: i64,
    pub from_user: Option<i64>,
    pub to_user: Option<i64>,
    pub amount: i64,
    pub kind: String,
    pub note: Option<String>,
    pub correlation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            guild_id: tx.guild_id.to_db(),
            from_user: tx.from.map(UserId::to_db),
            to_user: tx.to.map(UserId::to_db),
            amount: tx.amount,
            kind: tx.kind.as_ref().to_string(),
            note: tx.note.clone(),
            correlation_id: tx.correlation_id,
            created_at: tx.created_at,
        }
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StorageError;

    fn try_from(row: TransactionRow) -> StorageResult<Self> {
        let kind = TransactionKind::from_str(&row.kind).map_err(|_| {
            StorageError::new(StorageErrorKind::Corrupt(format!(
                "transaction {} has unknown kind '{}'",
                row.id, row.kind
            )))
        })?;
        Ok(Self {
            id: row.id,
            guild_id: GuildId::from_db(row.guild_id),
            from: row.from_user.map(UserId::from_db),
            to: row.to_user.map(UserId::from_db),
            amount: row.amount,
            kind,
            note: row.note,
            correlation_id: row.correlation_id,
            created_at: row.created_at,
        })
    }
}

/// A row of the `inventory` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = inventory)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryRow {
    pub guild_id: i64,
    pub user_id: i64,
    pub item_id: String,
    pub quantity: i32,
    pub acquired_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryEntry {
    fn from(row: InventoryRow) -> Self {
        Self {
            item_id: row.item_id,
            quantity: row.quantity,
            acquired_at: row.acquired_at,
        }
    }
}

/// A row of the `achievement_unlocks` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = achievement_unlocks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UnlockRow {
    pub guild_id: i64,
    pub user_id: i64,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

impl From<UnlockRow> for AchievementUnlock {
    fn from(row: UnlockRow) -> Self {
        Self {
            achievement_id: row.achievement_id,
            unlocked_at: row.unlocked_at,
        }
    }
}
