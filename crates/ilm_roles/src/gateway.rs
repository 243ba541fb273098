//! The platform seam role verification writes through.

use async_trait::async_trait;
use ilm_core::{GuildId, RoleId, UserId};
use ilm_error::GatewayResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A guild member as resolved by the gateway when the command arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// User id
    pub user_id: UserId,
    /// Display name used in replies and audit reasons
    pub display_name: String,
    /// Whether the account is a bot
    pub is_bot: bool,
    /// Roles held in the guild
    pub roles: BTreeSet<RoleId>,
}

impl MemberSnapshot {
    /// A human member with the given roles.
    pub fn new(
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            is_bot: false,
            roles: roles.into_iter().collect(),
        }
    }

    /// Mark the member as a bot.
    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Whether the member holds a role.
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    /// Platform mention markup.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// Role mutations on the chat platform.
///
/// Calls are awaited and never retried by the engine.
#[async_trait]
pub trait RoleGateway: Send + Sync {
    /// Give `user` the `role`.
    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> GatewayResult<()>;

    /// Take `role` away from `user`.
    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> GatewayResult<()>;
}
