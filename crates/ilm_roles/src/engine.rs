//! The role verification engine.

use crate::{MemberSnapshot, RoleGateway, VerifyError, VerifyErrorKind, VerifyResult};
use derive_getters::Getters;
use ilm_core::{ConfigResult, Direction, GuildId, IlmConfig, ResolvedBinding};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A verification command as received.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct VerificationRequest {
    guild_id: Option<GuildId>,
    actor: MemberSnapshot,
    target: MemberSnapshot,
    direction: Direction,
}

impl VerificationRequest {
    /// Build a request.
    pub fn new(
        guild_id: Option<GuildId>,
        actor: MemberSnapshot,
        target: MemberSnapshot,
        direction: Direction,
    ) -> Self {
        Self {
            guild_id,
            actor,
            target,
            direction,
        }
    }
}

/// How a verification ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Destination role granted.
    Verified {
        /// Whether the unverified role was taken away
        source_role_removed: bool,
    },
    /// Destination role granted but the unverified role could not be removed.
    /// The grant is kept.
    PartiallyVerified {
        /// Why the removal failed
        removal_error: VerifyError,
    },
}

/// Grants verified roles through a [`RoleGateway`].
pub struct RoleVerificationEngine {
    gateway: Arc<dyn RoleGateway>,
    bindings: BTreeMap<Direction, ResolvedBinding>,
}

impl std::fmt::Debug for RoleVerificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleVerificationEngine")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl RoleVerificationEngine {
    /// Create an engine with already resolved bindings.
    pub fn new(
        gateway: Arc<dyn RoleGateway>,
        bindings: BTreeMap<Direction, ResolvedBinding>,
    ) -> Self {
        Self { gateway, bindings }
    }

    /// Create an engine from the bot configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured binding names an unknown role.
    pub fn from_config(gateway: Arc<dyn RoleGateway>, config: &IlmConfig) -> ConfigResult<Self> {
        let bindings: BTreeMap<_, _> = config
            .verification()
            .keys()
            .map(|direction| Ok((*direction, config.binding(*direction)?)))
            .collect::<ConfigResult<_>>()?;
        Ok(Self::new(gateway, bindings))
    }

    /// Role ids bound to a direction.
    pub fn binding(&self, direction: Direction) -> Option<&ResolvedBinding> {
        self.bindings.get(&direction)
    }

    /// Verify the request's target.
    ///
    /// Checks run in order: guild context, actor's verifier role, target not a
    /// bot, target not already verified. Then the destination role is added
    /// and, if the target holds it, the unverified role is removed. A failed
    /// removal yields [`VerificationOutcome::PartiallyVerified`]; the added
    /// role is not rolled back.
    #[instrument(
        skip(self, request),
        fields(
            direction = %request.direction,
            actor = %request.actor.user_id,
            target = %request.target.user_id
        )
    )]
    pub async fn verify(&self, request: &VerificationRequest) -> VerifyResult<VerificationOutcome> {
        let guild_id = request
            .guild_id
            .ok_or_else(|| VerifyError::new(VerifyErrorKind::NotGuildContext))?;

        let binding = self.binding(request.direction).ok_or_else(|| {
            VerifyError::new(VerifyErrorKind::UnboundDirection(request.direction))
        })?;

        if !request.actor.has_role(binding.verifier) {
            debug!("Actor lacks verifier role");
            return Err(VerifyError::new(VerifyErrorKind::Forbidden {
                required: binding.verifier,
            }));
        }

        let target = &request.target;
        if target.is_bot {
            return Err(VerifyError::new(VerifyErrorKind::InvalidTarget(
                "bots cannot be verified".to_string(),
            )));
        }

        if target.has_role(binding.destination) {
            debug!("Target already holds destination role");
            return Err(VerifyError::new(VerifyErrorKind::AlreadyVerified));
        }

        let reason = format!(
            "Verified as {} by {} ({})",
            request.direction, request.actor.display_name, request.actor.user_id
        );

        self.gateway
            .add_role(guild_id, target.user_id, binding.destination, &reason)
            .await?;
        info!(role = %binding.destination, "Granted verified role");

        let Some(unverified) = binding.unverified.filter(|role| target.has_role(*role)) else {
            return Ok(VerificationOutcome::Verified {
                source_role_removed: false,
            });
        };

        match self
            .gateway
            .remove_role(guild_id, target.user_id, unverified, &reason)
            .await
        {
            Ok(()) => {
                info!(role = %unverified, "Removed unverified role");
                Ok(VerificationOutcome::Verified {
                    source_role_removed: true,
                })
            }
            Err(e) => {
                warn!(role = %unverified, error = %e, "Verified role kept, removal failed");
                Ok(VerificationOutcome::PartiallyVerified {
                    removal_error: e.into(),
                })
            }
        }
    }
}
