//! Balance reconstruction from the ledger.

use crate::{EconomyResult, Ledger};
use ilm_core::{AccountKey, GuildId, LeaderboardMetric, Transaction};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

/// Sum every leg's effect per account.
pub fn replay_balances<'a>(
    legs: impl IntoIterator<Item = &'a Transaction>,
) -> BTreeMap<AccountKey, i64> {
    let mut balances = BTreeMap::new();
    for leg in legs {
        if let Some(to) = leg.to_account() {
            *balances.entry(to).or_insert(0) += leg.amount;
        }
        if let Some(from) = leg.from_account() {
            *balances.entry(from).or_insert(0) -= leg.amount;
        }
    }
    balances
}

/// An account whose stored balance disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    /// Affected account
    pub key: AccountKey,
    /// Balance on the account row
    pub stored: i64,
    /// Balance implied by the ledger
    pub replayed: i64,
}

impl Ledger {
    /// Compare every account of a guild against a replay of its ledger.
    #[instrument(skip(self), fields(%guild_id))]
    pub async fn audit(&self, guild_id: GuildId) -> EconomyResult<Vec<BalanceMismatch>> {
        let legs = self.store().all_transactions(guild_id).await?;
        let mut replayed = replay_balances(&legs);

        let accounts = self
            .store()
            .leaderboard(guild_id, LeaderboardMetric::Coins, i64::MAX as usize)
            .await?;

        let mut mismatches = Vec::new();
        for row in accounts {
            let key = AccountKey::new(guild_id, row.user_id);
            let expected = replayed.remove(&key).unwrap_or(0);
            if expected != row.value {
                mismatches.push(BalanceMismatch {
                    key,
                    stored: row.value,
                    replayed: expected,
                });
            }
        }
        // Legs pointing at accounts that were never stored
        for (key, balance) in replayed {
            if balance != 0 {
                mismatches.push(BalanceMismatch {
                    key,
                    stored: 0,
                    replayed: balance,
                });
            }
        }

        if !mismatches.is_empty() {
            warn!(count = mismatches.len(), "Ledger audit found mismatches");
        }
        Ok(mismatches)
    }
}
