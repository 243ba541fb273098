//! Role mutations through the Discord REST API.

use async_trait::async_trait;
use ilm_core::{GuildId, RoleId, UserId};
use ilm_error::{GatewayError, GatewayResult};
use ilm_roles::RoleGateway;
use serenity::http::{Http, HttpBuilder};
use std::sync::Arc;
use tracing::{debug, instrument};

/// [`RoleGateway`] that calls Discord's member role endpoints.
#[derive(Clone)]
pub struct SerenityRoleGateway {
    http: Arc<Http>,
}

impl std::fmt::Debug for SerenityRoleGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityRoleGateway").finish_non_exhaustive()
    }
}

impl SerenityRoleGateway {
    /// Gateway with its own REST client for the bot token.
    ///
    /// The client's rate limiter is disabled: role calls are never retried, so
    /// a 429 comes back as [`GatewayErrorKind::RateLimited`](ilm_error::GatewayErrorKind::RateLimited)
    /// rather than being slept on and re-sent.
    pub fn from_token(token: &str) -> Self {
        let http = HttpBuilder::new(token).ratelimiter_disabled(true).build();
        Self {
            http: Arc::new(http),
        }
    }
}

#[async_trait]
impl RoleGateway for SerenityRoleGateway {
    #[instrument(skip(self), fields(%guild, %user, %role))]
    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> GatewayResult<()> {
        self.http
            .add_member_role(
                serenity::all::GuildId::new(guild.get()),
                serenity::all::UserId::new(user.get()),
                serenity::all::RoleId::new(role.get()),
                Some(reason),
            )
            .await
            .map_err(GatewayError::from)?;
        debug!("Role added");
        Ok(())
    }

    #[instrument(skip(self), fields(%guild, %user, %role))]
    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> GatewayResult<()> {
        self.http
            .remove_member_role(
                serenity::all::GuildId::new(guild.get()),
                serenity::all::UserId::new(user.get()),
                serenity::all::RoleId::new(role.get()),
                Some(reason),
            )
            .await
            .map_err(GatewayError::from)?;
        debug!("Role removed");
        Ok(())
    }
}
