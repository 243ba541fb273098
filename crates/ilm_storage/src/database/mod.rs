//! PostgreSQL implementation of [`AccountStore`].
//!
//! Diesel is synchronous, so every call checks a connection out of an r2d2
//! pool and runs on tokio's blocking thread pool.

mod models;
mod schema;

use crate::{AccountStore, LedgerCommit};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use ilm_core::{
    Account, AccountKey, AchievementUnlock, GuildId, InventoryEntry, LeaderboardEntry,
    LeaderboardMetric, Transaction,
};
use ilm_error::{StorageError, StorageErrorKind, StorageResult};
use models::{AccountRow, InventoryRow, TransactionRow, UnlockRow};
use schema::{accounts, achievement_unlocks, inventory, ledger_transactions};
use tracing::{debug, info, instrument};

type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Run pending migrations.
pub fn run_migrations(conn: &mut PgConnection) -> StorageResult<()> {
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    conn.run_pending_migrations(MIGRATIONS)
        .map(|applied| info!(count = applied.len(), "Applied migrations"))
        .map_err(|e| StorageError::new(StorageErrorKind::Migration(e.to_string())))
}

/// Account store backed by PostgreSQL with connection pooling.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Connect to `database_url` with a pool of at most `pool_size` connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built or the first connection
    /// cannot be established.
    pub fn connect(database_url: &str, pool_size: u32) -> StorageResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        // Warm up the pool by getting and immediately releasing a connection
        {
            let _conn = pool.get()?;
        }

        info!(pool_size, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> StorageResult<()> {
        self.blocking(run_migrations).await
    }

    async fn blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StorageResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Backend(format!("Task join error: {}", e))))?
    }
}

fn conflict(key: AccountKey, expected: i64) -> StorageError {
    StorageError::new(StorageErrorKind::Conflict {
        key: key.to_string(),
        expected,
    })
}

/// Write one account at `expected + 1` if the stored revision is `expected`.
fn write_account(
    conn: &mut PgConnection,
    account: &Account,
    expected: i64,
) -> StorageResult<Account> {
    let key = account.key();
    let mut row = AccountRow::from(account);
    row.revision = expected + 1;

    let written = if expected == 0 {
        diesel::insert_into(accounts::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(conn)?
    } else {
        diesel::update(
            accounts::table
                .find((row.guild_id, row.user_id))
                .filter(accounts::revision.eq(expected)),
        )
        .set(&row)
        .execute(conn)?
    };

    if written == 0 {
        debug!(%key, expected, "Revision mismatch");
        return Err(conflict(key, expected));
    }
    Ok(row.into())
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    #[instrument(skip(self), fields(%key))]
    async fn get(&self, key: AccountKey) -> StorageResult<Option<Account>> {
        self.blocking(move |conn| {
            let row = accounts::table
                .find((key.guild_id.to_db(), key.user_id.to_db()))
                .select(AccountRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Account::from))
        })
        .await
    }

    #[instrument(skip(self, account), fields(key = %account.key()))]
    async fn put(&self, account: Account, expected_revision: i64) -> StorageResult<Account> {
        self.blocking(move |conn| write_account(conn, &account, expected_revision))
            .await
    }

    async fn append_transaction(&self, transaction: Transaction) -> StorageResult<()> {
        self.blocking(move |conn| {
            diesel::insert_into(ledger_transactions::table)
                .values(TransactionRow::from(&transaction))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    #[instrument(
        skip(self, commit),
        fields(accounts = commit.accounts.len(), legs = commit.transactions.len())
    )]
    async fn commit(&self, commit: LedgerCommit) -> StorageResult<Vec<Account>> {
        self.blocking(move |conn| {
            conn.transaction::<_, StorageError, _>(|conn| {
                let mut stored = Vec::with_capacity(commit.accounts.len());
                for account in &commit.accounts {
                    stored.push(write_account(conn, account, account.revision)?);
                }

                let legs: Vec<TransactionRow> =
                    commit.transactions.iter().map(TransactionRow::from).collect();
                if !legs.is_empty() {
                    diesel::insert_into(ledger_transactions::table)
                        .values(&legs)
                        .execute(conn)?;
                }

                for grant in &commit.inventory {
                    let row = InventoryRow {
                        guild_id: grant.key.guild_id.to_db(),
                        user_id: grant.key.user_id.to_db(),
                        item_id: grant.item_id.clone(),
                        quantity: grant.quantity,
                        acquired_at: grant.acquired_at,
                    };
                    diesel::insert_into(inventory::table)
                        .values(&row)
                        .on_conflict((inventory::guild_id, inventory::user_id, inventory::item_id))
                        .do_update()
                        .set(inventory::quantity.eq(inventory::quantity + grant.quantity))
                        .execute(conn)?;
                }

                for record in &commit.unlocks {
                    let row = UnlockRow {
                        guild_id: record.key.guild_id.to_db(),
                        user_id: record.key.user_id.to_db(),
                        achievement_id: record.unlock.achievement_id.clone(),
                        unlocked_at: record.unlock.unlocked_at,
                    };
                    let inserted = diesel::insert_into(achievement_unlocks::table)
                        .values(&row)
                        .on_conflict_do_nothing()
                        .execute(conn)?;
                    if inserted == 0 {
                        return Err(conflict(record.key, -1));
                    }
                }

                Ok(stored)
            })
        })
        .await
    }

    async fn transactions(
        &self,
        key: AccountKey,
        limit: usize,
    ) -> StorageResult<Vec<Transaction>> {
        self.blocking(move |conn| {
            let user = key.user_id.to_db();
            let rows = ledger_transactions::table
                .filter(ledger_transactions::guild_id.eq(key.guild_id.to_db()))
                .filter(
                    ledger_transactions::from_user
                        .eq(user)
                        .or(ledger_transactions::to_user.eq(user)),
                )
                .order(ledger_transactions::created_at.desc())
                .limit(limit as i64)
                .select(TransactionRow::as_select())
                .load(conn)?;
            rows.into_iter().map(Transaction::try_from).collect()
        })
        .await
    }

    async fn all_transactions(&self, guild_id: GuildId) -> StorageResult<Vec<Transaction>> {
        self.blocking(move |conn| {
            let rows = ledger_transactions::table
                .filter(ledger_transactions::guild_id.eq(guild_id.to_db()))
                .order(ledger_transactions::created_at.asc())
                .select(TransactionRow::as_select())
                .load(conn)?;
            rows.into_iter().map(Transaction::try_from).collect()
        })
        .await
    }

    async fn leaderboard(
        &self,
        guild_id: GuildId,
        metric: LeaderboardMetric,
        limit: usize,
    ) -> StorageResult<Vec<LeaderboardEntry>> {
        self.blocking(move |conn| {
            let query = accounts::table
                .filter(accounts::guild_id.eq(guild_id.to_db()))
                .select(AccountRow::as_select())
                .limit(limit as i64)
                .into_boxed();
            let query = match metric {
                LeaderboardMetric::Coins => {
                    query.order((accounts::coin_balance.desc(), accounts::user_id.asc()))
                }
                LeaderboardMetric::GoodDeedPoints => {
                    query.order((accounts::good_deed_points.desc(), accounts::user_id.asc()))
                }
                LeaderboardMetric::TotalEarned => {
                    query.order((accounts::total_earned.desc(), accounts::user_id.asc()))
                }
            };
            let rows = query.load(conn)?;
            Ok(rows
                .into_iter()
                .map(|row| {
                    let account = Account::from(row);
                    LeaderboardEntry {
                        user_id: account.user_id,
                        value: metric.value(&account),
                    }
                })
                .collect())
        })
        .await
    }

    async fn inventory(&self, key: AccountKey) -> StorageResult<Vec<InventoryEntry>> {
        self.blocking(move |conn| {
            let rows = inventory::table
                .filter(inventory::guild_id.eq(key.guild_id.to_db()))
                .filter(inventory::user_id.eq(key.user_id.to_db()))
                .order(inventory::item_id.asc())
                .select(InventoryRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(InventoryEntry::from).collect())
        })
        .await
    }

    async fn achievements(&self, key: AccountKey) -> StorageResult<Vec<AchievementUnlock>> {
        self.blocking(move |conn| {
            let rows = achievement_unlocks::table
                .filter(achievement_unlocks::guild_id.eq(key.guild_id.to_db()))
                .filter(achievement_unlocks::user_id.eq(key.user_id.to_db()))
                .order(achievement_unlocks::unlocked_at.asc())
                .select(UnlockRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(AchievementUnlock::from).collect())
        })
        .await
    }
}
