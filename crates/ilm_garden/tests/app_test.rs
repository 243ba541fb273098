//! Assembly tests: configuration loading, store selection and router wiring.

use async_trait::async_trait;
use ilm_core::{GuildId, RoleId, UserId};
use ilm_error::GatewayResult;
use ilm_garden::{build_router, load_config, open_store};
use ilm_roles::{MemberSnapshot, RoleGateway};
use ilm_social::CommandRequest;
use std::io::Write;
use std::sync::Arc;

struct NoopGateway;

#[async_trait]
impl RoleGateway for NoopGateway {
    async fn add_role(&self, _: GuildId, _: UserId, _: RoleId, _: &str) -> GatewayResult<()> {
        Ok(())
    }

    async fn remove_role(&self, _: GuildId, _: UserId, _: RoleId, _: &str) -> GatewayResult<()> {
        Ok(())
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_bundled_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../ilm_garden.toml");
    let config = load_config(&path).expect("bundled config loads");
    assert_eq!(config.verification().len(), 2);
    assert_eq!(*config.economy().starting_balance(), 100);
}

#[test]
fn test_binding_to_unknown_role_is_rejected() {
    let file = write_config(
        r#"
[roles]
female = 200

[verification.female]
verifier_role = "nobody"
destination_role = "female"
"#,
    );
    assert!(load_config(file.path()).is_err());
}

#[tokio::test]
async fn test_memory_store_serves_commands() {
    let file = write_config(
        r#"
[economy]
starting_balance = 250

[storage]
backend = "memory"
"#,
    );
    let config = load_config(file.path()).expect("config loads");
    let store = open_store(&config, false).await.expect("memory store");
    let router = build_router(&config, store, Arc::new(NoopGateway)).expect("router builds");

    let actor = MemberSnapshot::new(5u64, "yusuf", []);
    let reply = router
        .handle(CommandRequest::new("balance", actor, Some(GuildId(3))))
        .await;
    assert!(reply.content.contains("Ilm Coins: 250"), "{}", reply.content);
}

#[tokio::test]
async fn test_memory_flag_overrides_postgres_backend() {
    let file = write_config(
        r#"
[storage]
backend = "postgres"
"#,
    );
    let config = load_config(file.path()).expect("config loads");
    assert!(open_store(&config, true).await.is_ok());
}
