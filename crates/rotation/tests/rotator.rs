//! Orchestrator behaviour against the in-memory store and mocked issuer

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use mockall::mock;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tailrotate_rotation::{
    RotationConfig, RotationErrorKind, RotationEvent, RotationOutcome, RotationStep,
    SecretRotator,
};
use tailrotate_store::{MemorySecretStore, StoreCall, VersionStage};
use tailrotate_tailscale::{
    ClientKey, IssuerConnector, KeyIssuer, KeyUsage, OAuthCredentials, TailscaleError,
    TailscaleResult, VerifyError,
};

mock! {
    pub Issuer {}

    #[async_trait]
    impl KeyIssuer for Issuer {
        async fn create_key(&self, usage: KeyUsage) -> TailscaleResult<ClientKey>;
        async fn verify_key(&self, id: &str, usage: KeyUsage) -> TailscaleResult<()>;
        async fn delete_key(&self, id: &str) -> TailscaleResult<()>;
    }
}

mock! {
    pub Connector {}

    #[async_trait]
    impl IssuerConnector for Connector {
        async fn connect(
            &self,
            credentials: &OAuthCredentials,
            tailnet: &str,
            tag_name: &str,
        ) -> TailscaleResult<Box<dyn KeyIssuer>>;
    }
}

const SECRET: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:tailscale-client-key";
const OAUTH: &str = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:tailscale-oauth";

fn config() -> RotationConfig {
    RotationConfig {
        oauth_secret_arn: OAUTH.into(),
        tailnet: "example.com".into(),
        tag_name: "fleet".into(),
        ..RotationConfig::default()
    }
}

fn client_key(id: &str) -> ClientKey {
    let created = Utc::now();
    ClientKey {
        id: id.into(),
        key: format!("tskey-auth-{id}-secret"),
        created,
        expires: created + TimeDelta::days(90),
    }
}

/// Store holding the OAuth secret and a rotating secret with `tags`
fn store(tags: &[(&str, &str)]) -> Arc<MemorySecretStore> {
    let store = MemorySecretStore::new();
    store.seed_version(
        OAUTH,
        "oauth-v1",
        r#"{"id": "oauth-id", "key": "oauth-key"}"#,
        [VersionStage::Current],
    );
    store.create_secret(SECRET, tags.iter().copied());
    Arc::new(store)
}

fn connector(issuer: MockIssuer) -> MockConnector {
    let issuer: Box<dyn KeyIssuer> = Box::new(issuer);
    let mut connector = MockConnector::new();
    connector
        .expect_connect()
        .withf(|credentials, tailnet, tag_name| {
            credentials.id() == "oauth-id" && tailnet == "example.com" && tag_name == "fleet"
        })
        .times(1)
        .return_once(move |_, _, _| Ok(issuer));
    connector
}

fn rotator(store: &Arc<MemorySecretStore>, connector: MockConnector) -> SecretRotator {
    SecretRotator::new(config(), store.clone(), Arc::new(connector))
}

#[tokio::test]
async fn finish_moves_current_from_previous_holder() {
    // GIVEN v1 pending and v0 current
    let store = store(&[]);
    store.seed_version(SECRET, "v0", "{}", [VersionStage::Current]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);

    // WHEN finishing v1
    let outcome = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "finishSecret")
        .await
        .unwrap();

    // THEN the store is asked to move the stage away from v0 exactly once
    assert_eq!(
        outcome,
        RotationOutcome::Promoted {
            previous: Some("v0".into())
        }
    );
    assert!(store.calls().contains(&StoreCall::Promote {
        secret_id: SECRET.into(),
        version_id: "v1".into(),
        remove_from: Some("v0".into()),
    }));
    assert_eq!(store.write_count(), 1);
    assert!(store.stages(SECRET, "v1").unwrap().contains(&VersionStage::Current));
}

#[tokio::test]
async fn first_rotation_promotes_without_remove_from() {
    let store = store(&[]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);

    let outcome = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "finishSecret")
        .await
        .unwrap();

    assert_eq!(outcome, RotationOutcome::Promoted { previous: None });
    assert!(store.calls().contains(&StoreCall::Promote {
        secret_id: SECRET.into(),
        version_id: "v1".into(),
        remove_from: None,
    }));
}

#[rstest]
#[case(RotationStep::CreateSecret)]
#[case(RotationStep::SetSecret)]
#[case(RotationStep::TestSecret)]
#[case(RotationStep::FinishSecret)]
#[tokio::test]
async fn current_version_is_a_no_op_for_every_step(#[case] step: RotationStep) {
    // GIVEN a version that already carries the current stage
    let store = store(&[("Purpose", "Cattle")]);
    store.seed_version(
        SECRET,
        "v1",
        "{}",
        [VersionStage::Current, VersionStage::Pending],
    );

    // WHEN any step is retried for it (the mocked issuer panics on any call)
    let outcome = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", step.as_str())
        .await
        .unwrap();

    // THEN nothing is written
    assert_eq!(outcome, RotationOutcome::AlreadyCurrent);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn disabled_rotation_fails_without_writes() {
    let store = store(&[]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);
    store.set_rotation_enabled(SECRET, false);

    let err = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::RotationDisabled);
    assert_eq!(
        err.to_string(),
        format!("Secret {SECRET} does not have rotation enabled")
    );
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn unknown_step_fails_after_describe() {
    let store = store(&[]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);

    let err = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "promoteToTopSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::InvalidStep);
    assert!(store.calls().contains(&StoreCall::Describe {
        secret_id: SECRET.into()
    }));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn unstaged_version_is_rejected() {
    let store = store(&[]);
    store.seed_version(SECRET, "v0", "{}", [VersionStage::Current]);

    let err = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v9", "testSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::VersionNotStaged);
}

#[tokio::test]
async fn version_without_pending_stage_is_a_mismatch() {
    let store = store(&[]);
    store.seed_version(
        SECRET,
        "v1",
        "{}",
        [VersionStage::Other("AWSPREVIOUS".into())],
    );

    let err = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "finishSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::StageMismatch);
    assert_eq!(store.write_count(), 0);
}

#[rstest]
#[case(&[("Purpose", "Cattle")], KeyUsage::Reusable)]
#[case(&[("Purpose", "SingleUse")], KeyUsage::SingleUse)]
#[case(&[("Team", "Cattle")], KeyUsage::SingleUse)]
#[case(&[], KeyUsage::SingleUse)]
#[tokio::test]
async fn create_issues_key_for_purpose_and_writes_pending_once(
    #[case] tags: &[(&str, &str)],
    #[case] usage: KeyUsage,
) {
    // GIVEN a rotation that staged v1 as pending without a value yet
    let store = store(tags);
    store.seed_version(SECRET, "v0", "{}", [VersionStage::Current]);
    store.stage_version(SECRET, "v1", [VersionStage::Pending]);

    let issued = client_key("k-new");
    let expected = serde_json::to_value(&issued).unwrap();
    let mut issuer = MockIssuer::new();
    issuer
        .expect_create_key()
        .with(eq(usage))
        .times(1)
        .return_once(move |_| Ok(issued));

    // WHEN running createSecret
    let outcome = rotator(&store, connector(issuer))
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap();

    // THEN the issued key is stored once as the pending value
    assert_eq!(
        outcome,
        RotationOutcome::Created {
            key_id: "k-new".into()
        }
    );
    assert_eq!(store.write_count(), 1);
    let stored: serde_json::Value =
        serde_json::from_str(&store.value(SECRET, "v1").unwrap()).unwrap();
    assert_eq!(stored, expected);
    assert!(stored.get("capabilities").is_none());
    assert!(store.stages(SECRET, "v1").unwrap().contains(&VersionStage::Pending));
}

#[tokio::test]
async fn failed_issuance_writes_nothing() {
    let store = store(&[]);
    store.stage_version(SECRET, "v1", [VersionStage::Pending]);

    let mut issuer = MockIssuer::new();
    issuer
        .expect_create_key()
        .times(1)
        .return_once(|_| Err(TailscaleError::Unauthenticated));

    let err = rotator(&store, connector(issuer))
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::Unauthenticated);
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.value(SECRET, "v1"), None);
}

#[rstest]
#[case(Ok(()))]
#[case(Err(TailscaleError::Unauthenticated))]
#[tokio::test]
async fn rejected_pending_write_revokes_the_issued_key(#[case] revoke: TailscaleResult<()>) {
    // GIVEN v1 already holding the key of an earlier createSecret run
    let store = store(&[("Purpose", "Cattle")]);
    store.seed_version(SECRET, "v0", "{}", [VersionStage::Current]);
    let earlier = serde_json::to_string(&client_key("k-first")).unwrap();
    store.seed_version(SECRET, "v1", &earlier, [VersionStage::Pending]);

    let mut issuer = MockIssuer::new();
    issuer
        .expect_create_key()
        .times(1)
        .return_once(|_| Ok(client_key("k-second")));
    issuer
        .expect_delete_key()
        .withf(|id| id == "k-second")
        .times(1)
        .return_once(move |_| revoke);

    // WHEN createSecret is retried for v1
    let err = rotator(&store, connector(issuer))
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap_err();

    // THEN the store error is returned and the earlier value survives
    assert_eq!(err.kind(), RotationErrorKind::Store);
    assert_eq!(store.value(SECRET, "v1"), Some(earlier));
}

#[rstest]
#[case("setSecret")]
#[case("testSecret")]
#[tokio::test]
async fn set_and_test_verify_the_pending_key(#[case] step: &str) {
    // GIVEN a pending version holding an issued key
    let store = store(&[("Purpose", "Cattle")]);
    let pending = serde_json::to_string(&client_key("k-new")).unwrap();
    store.seed_version(SECRET, "v1", &pending, [VersionStage::Pending]);

    let mut issuer = MockIssuer::new();
    issuer
        .expect_verify_key()
        .withf(|id, usage| id == "k-new" && *usage == KeyUsage::Reusable)
        .times(1)
        .returning(|_, _| Ok(()));

    // WHEN running either validation step
    let outcome = rotator(&store, connector(issuer))
        .rotate(SECRET, "v1", step)
        .await
        .unwrap();

    // THEN the key is verified and nothing is written
    assert_eq!(
        outcome,
        RotationOutcome::Verified {
            key_id: "k-new".into()
        }
    );
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn verification_failure_keeps_its_kind() {
    let store = store(&[]);
    let pending = serde_json::to_string(&client_key("k-new")).unwrap();
    store.seed_version(SECRET, "v1", &pending, [VersionStage::Pending]);

    let mut issuer = MockIssuer::new();
    issuer
        .expect_verify_key()
        .withf(|id, usage| id == "k-new" && *usage == KeyUsage::SingleUse)
        .times(1)
        .returning(|_, _| {
            Err(TailscaleError::Verify(VerifyError::ExpiringTooSoon {
                expires: Utc::now() + TimeDelta::days(30),
                min_days: 60,
            }))
        });

    let err = rotator(&store, connector(issuer))
        .rotate(SECRET, "v1", "testSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::ExpiringTooSoon);
}

#[tokio::test]
async fn malformed_pending_value_is_a_decode_error() {
    let store = store(&[]);
    store.seed_version(SECRET, "v1", "tskey-raw", [VersionStage::Pending]);

    let err = rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "testSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::Decode);
}

#[tokio::test]
async fn missing_configuration_fails_before_any_call() {
    // GIVEN no tailnet configured and a connector that must not be used
    let store = store(&[]);
    let config = RotationConfig {
        tailnet: String::new(),
        ..config()
    };
    let rotator = SecretRotator::new(config, store.clone(), Arc::new(MockConnector::new()));

    // WHEN rotating
    let err = rotator
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap_err();

    // THEN configuration is blamed and the store was never touched
    assert_eq!(err.kind(), RotationErrorKind::Configuration);
    assert!(err.to_string().contains("TAILNET"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn malformed_oauth_secret_stops_before_authentication() {
    let store = store(&[]);
    store.seed_version(OAUTH, "oauth-v2", r#"{"id": "only-id"}"#, [VersionStage::Current]);

    let err = rotator(&store, MockConnector::new())
        .rotate(SECRET, "v1", "createSecret")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RotationErrorKind::Decode);
    assert_eq!(
        store.calls(),
        vec![StoreCall::GetCurrent {
            secret_id: OAUTH.into()
        }]
    );
}

#[tokio::test]
async fn preconditions_run_in_order() {
    let store = store(&[]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);

    rotator(&store, connector(MockIssuer::new()))
        .rotate(SECRET, "v1", "finishSecret")
        .await
        .unwrap();

    assert_eq!(
        store.calls(),
        vec![
            StoreCall::GetCurrent {
                secret_id: OAUTH.into()
            },
            StoreCall::Describe {
                secret_id: SECRET.into()
            },
            StoreCall::Promote {
                secret_id: SECRET.into(),
                version_id: "v1".into(),
                remove_from: None,
            },
        ]
    );
}

#[tokio::test]
async fn event_is_dispatched_like_a_direct_call() {
    let store = store(&[]);
    store.seed_version(SECRET, "v0", "{}", [VersionStage::Current]);
    store.seed_version(SECRET, "v1", "{}", [VersionStage::Pending]);
    let event: RotationEvent = serde_json::from_str(&format!(
        r#"{{"SecretId": "{SECRET}", "ClientRequestToken": "v1", "Step": "finishSecret"}}"#
    ))
    .unwrap();

    let outcome = rotator(&store, connector(MockIssuer::new()))
        .handle(&event)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RotationOutcome::Promoted {
            previous: Some("v0".into())
        }
    );
}
