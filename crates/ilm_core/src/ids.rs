//! Platform identifiers.
//!
//! Discord ids are 64-bit unsigned snowflakes. PostgreSQL stores them as
//! signed bigints, so each newtype offers lossless `i64` conversions.

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        #[display("{}", _0)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw snowflake value.
            pub fn get(self) -> u64 {
                self.0
            }

            /// Bit-preserving conversion for signed bigint columns.
            pub fn to_db(self) -> i64 {
                self.0 as i64
            }

            /// Inverse of [`Self::to_db`].
            pub fn from_db(value: i64) -> Self {
                Self(value as u64)
            }
        }
    };
}

snowflake!(
    /// A guild (server) id.
    GuildId
);
snowflake!(
    /// A user id.
    UserId
);
snowflake!(
    /// A role id.
    RoleId
);

/// Identity of an account: one per user per guild.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("{}/{}", guild_id, user_id)]
pub struct AccountKey {
    /// Guild the account lives in
    pub guild_id: GuildId,
    /// Owner of the account
    pub user_id: UserId,
}

impl AccountKey {
    /// Build a key from a guild and user.
    pub fn new(guild_id: impl Into<GuildId>, user_id: impl Into<UserId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip_preserves_high_bit() {
        let id = UserId(u64::MAX - 7);
        assert!(id.to_db() < 0);
        assert_eq!(UserId::from_db(id.to_db()), id);
    }

    #[test]
    fn test_account_keys_order_by_guild_then_user() {
        let a = AccountKey::new(1u64, 9u64);
        let b = AccountKey::new(2u64, 1u64);
        let c = AccountKey::new(2u64, 3u64);
        let mut keys = vec![c, a, b];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
        assert_eq!(a.to_string(), "1/9");
    }
}
