//! Assembling the engines from configuration.

use ilm_core::{IlmConfig, StorageBackend};
use ilm_economy::{Ledger, RewardEngine};
use ilm_error::{ConfigError, ConfigErrorKind, IlmResult};
use ilm_roles::{RoleGateway, RoleVerificationEngine};
use ilm_social::CommandRouter;
use ilm_storage::{AccountStore, InMemoryAccountStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Environment variable holding the PostgreSQL connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Load and validate the bot configuration.
#[instrument]
pub fn load_config(path: &Path) -> IlmResult<IlmConfig> {
    let config = IlmConfig::from_file(path)?;
    config.validate()?;
    info!(
        roles = config.roles().len(),
        bindings = config.verification().len(),
        items = config.shop().items.len(),
        achievements = config.achievements().achievements.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Open the account store the configuration asks for.
///
/// `force_memory` overrides the configured backend.
#[instrument(skip(config))]
pub async fn open_store(config: &IlmConfig, force_memory: bool) -> IlmResult<Arc<dyn AccountStore>> {
    if force_memory || *config.storage().backend() == StorageBackend::Memory {
        warn!("Using the in-memory store; balances are lost on restart");
        return Ok(Arc::new(InMemoryAccountStore::new()));
    }
    open_postgres(config).await
}

#[cfg(feature = "database")]
async fn open_postgres(config: &IlmConfig) -> IlmResult<Arc<dyn AccountStore>> {
    let url = std::env::var(DATABASE_URL_ENV).map_err(|_| {
        ConfigError::new(ConfigErrorKind::Missing(format!(
            "{} must be set for the postgres backend",
            DATABASE_URL_ENV
        )))
    })?;
    let store = ilm_storage::PostgresAccountStore::connect(&url, *config.storage().pool_size())?;
    store.migrate().await?;
    info!("Connected to PostgreSQL");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "database"))]
async fn open_postgres(_config: &IlmConfig) -> IlmResult<Arc<dyn AccountStore>> {
    Err(ConfigError::new(ConfigErrorKind::Missing(
        "the postgres backend needs a build with the `database` feature".to_string(),
    ))
    .into())
}

/// Wire the ledger, reward and verification engines into a router.
pub fn build_router(
    config: &IlmConfig,
    store: Arc<dyn AccountStore>,
    gateway: Arc<dyn RoleGateway>,
) -> IlmResult<CommandRouter> {
    let ledger = Arc::new(Ledger::from_config(store, config));
    let rewards = RewardEngine::from_config(ledger, config);
    let roles = Arc::new(RoleVerificationEngine::from_config(gateway, config)?);
    Ok(CommandRouter::new(rewards, roles))
}
