//! Role verification tests against a recording gateway.

use async_trait::async_trait;
use ilm_core::{Direction, GuildId, IlmConfig, RoleId, UserId};
use ilm_error::{GatewayError, GatewayErrorKind, GatewayResult};
use ilm_roles::{
    MemberSnapshot, RoleGateway, RoleVerificationEngine, VerificationOutcome,
    VerificationRequest, VerifyErrorKind,
};
use parking_lot::Mutex;
use std::sync::Arc;

const VERIFIER: RoleId = RoleId(100);
const FEMALE: RoleId = RoleId(200);
const UNVERIFIED: RoleId = RoleId(300);
const GUILD: GuildId = GuildId(1);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Add(UserId, RoleId),
    Remove(UserId, RoleId),
}

#[derive(Debug, Default)]
struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    fail_add: Option<GatewayErrorKind>,
    fail_remove: Option<GatewayErrorKind>,
}

impl RecordingGateway {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RoleGateway for RecordingGateway {
    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> GatewayResult<()> {
        self.calls.lock().push(Call::Add(user_id, role_id));
        match &self.fail_add {
            Some(kind) => Err(GatewayError::new(kind.clone())),
            None => Ok(()),
        }
    }

    async fn remove_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> GatewayResult<()> {
        self.calls.lock().push(Call::Remove(user_id, role_id));
        match &self.fail_remove {
            Some(kind) => Err(GatewayError::new(kind.clone())),
            None => Ok(()),
        }
    }
}

const CONFIG: &str = r#"
[roles]
female_verifier = 100
female = 200
female_unverified = 300

[verification.female]
verifier_role = "female_verifier"
destination_role = "female"
unverified_role = "female_unverified"
"#;

fn engine(gateway: Arc<RecordingGateway>) -> RoleVerificationEngine {
    let config = IlmConfig::from_toml(CONFIG).unwrap();
    RoleVerificationEngine::from_config(gateway, &config).unwrap()
}

fn verifier() -> MemberSnapshot {
    MemberSnapshot::new(10u64, "Maryam", [VERIFIER])
}

fn newcomer() -> MemberSnapshot {
    MemberSnapshot::new(20u64, "Aisha", [UNVERIFIED])
}

fn request(actor: MemberSnapshot, target: MemberSnapshot) -> VerificationRequest {
    VerificationRequest::new(Some(GUILD), actor, target, Direction::Female)
}

#[tokio::test]
async fn test_verify_adds_then_removes() {
    let gateway = Arc::new(RecordingGateway::default());
    let outcome = engine(gateway.clone())
        .verify(&request(verifier(), newcomer()))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        VerificationOutcome::Verified {
            source_role_removed: true
        }
    );
    assert_eq!(
        gateway.calls(),
        vec![
            Call::Add(UserId(20), FEMALE),
            Call::Remove(UserId(20), UNVERIFIED)
        ]
    );
}

#[tokio::test]
async fn test_remove_skipped_when_target_lacks_unverified_role() {
    let gateway = Arc::new(RecordingGateway::default());
    let target = MemberSnapshot::new(20u64, "Aisha", []);
    let outcome = engine(gateway.clone())
        .verify(&request(verifier(), target))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        VerificationOutcome::Verified {
            source_role_removed: false
        }
    );
    assert_eq!(gateway.calls(), vec![Call::Add(UserId(20), FEMALE)]);
}

#[tokio::test]
async fn test_actor_without_verifier_role_is_forbidden() {
    let gateway = Arc::new(RecordingGateway::default());
    let actor = MemberSnapshot::new(10u64, "Zaid", []);
    let err = engine(gateway.clone())
        .verify(&request(actor, newcomer()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), &VerifyErrorKind::Forbidden { required: VERIFIER });
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_rejections_issue_no_role_calls() {
    let gateway = Arc::new(RecordingGateway::default());
    let engine = engine(gateway.clone());

    let no_guild = VerificationRequest::new(None, verifier(), newcomer(), Direction::Female);
    let err = engine.verify(&no_guild).await.unwrap_err();
    assert_eq!(err.kind(), &VerifyErrorKind::NotGuildContext);

    let err = engine
        .verify(&request(verifier(), newcomer().bot()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), VerifyErrorKind::InvalidTarget(_)));

    let already = MemberSnapshot::new(20u64, "Aisha", [FEMALE, UNVERIFIED]);
    let err = engine.verify(&request(verifier(), already)).await.unwrap_err();
    assert_eq!(err.kind(), &VerifyErrorKind::AlreadyVerified);

    let male = VerificationRequest::new(Some(GUILD), verifier(), newcomer(), Direction::Male);
    let err = engine.verify(&male).await.unwrap_err();
    assert_eq!(err.kind(), &VerifyErrorKind::UnboundDirection(Direction::Male));
    assert!(!err.is_user_facing());

    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_failed_removal_is_partial_success() {
    let gateway = Arc::new(RecordingGateway {
        fail_remove: Some(GatewayErrorKind::HierarchyViolation(
            "Missing Permissions".to_string(),
        )),
        ..Default::default()
    });
    let outcome = engine(gateway.clone())
        .verify(&request(verifier(), newcomer()))
        .await
        .unwrap();

    let VerificationOutcome::PartiallyVerified { removal_error } = &outcome else {
        panic!("expected partial success, got {:?}", outcome);
    };
    assert!(matches!(
        removal_error.kind(),
        VerifyErrorKind::HierarchyViolation(_)
    ));
    // The destination role stays granted
    assert_eq!(gateway.calls()[0], Call::Add(UserId(20), FEMALE));
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test]
async fn test_transport_failure_on_removal_is_partial_gateway_error() {
    let gateway = Arc::new(RecordingGateway {
        fail_remove: Some(GatewayErrorKind::Transport("HTTP 502: Bad Gateway".to_string())),
        ..Default::default()
    });
    let outcome = engine(gateway.clone())
        .verify(&request(verifier(), newcomer()))
        .await
        .unwrap();

    let VerificationOutcome::PartiallyVerified { removal_error } = &outcome else {
        panic!("expected partial success, got {:?}", outcome);
    };
    assert!(matches!(removal_error.kind(), VerifyErrorKind::Gateway(_)));
    assert!(!removal_error.is_user_facing());
    assert_eq!(
        gateway.calls(),
        vec![Call::Add(UserId(20), FEMALE), Call::Remove(UserId(20), UNVERIFIED)]
    );
}

#[tokio::test]
async fn test_failed_add_maps_gateway_errors() {
    let gateway = Arc::new(RecordingGateway {
        fail_add: Some(GatewayErrorKind::HierarchyViolation("role too high".into())),
        ..Default::default()
    });
    let err = engine(gateway.clone())
        .verify(&request(verifier(), newcomer()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), VerifyErrorKind::HierarchyViolation(_)));
    assert!(err.is_user_facing());
    assert_eq!(gateway.calls().len(), 1);

    let gateway = Arc::new(RecordingGateway {
        fail_add: Some(GatewayErrorKind::Transport("HTTP 500".into())),
        ..Default::default()
    });
    let err = engine(gateway)
        .verify(&request(verifier(), newcomer()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), VerifyErrorKind::Gateway(_)));
    assert!(!err.is_user_facing());
}
