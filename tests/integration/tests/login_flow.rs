//! Login flow integration tests.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use da_auth::{AuthError, Authenticator, AuthenticatorConfig, LoginStage, Realm};
use da_core::{EventOutcome, EventType};

use crate::common::{password, TestEnv};

/// Tests that mapped groups become roles and unmapped ones are ignored.
#[tokio::test]
async fn test_login_maps_admin_group() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    let user = env.authenticator.login("jdoe", &password("s3cret")).await?;

    assert_eq!(user.username, "jdoe");
    assert_eq!(user.roles, vec!["admin".to_string()]);
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 1);
    assert_eq!(env.directory.closes.load(Ordering::SeqCst), 1);

    Ok(())
}

/// Tests that roles follow directory order and keep duplicates.
#[tokio::test]
async fn test_roles_follow_directory_order() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.directory.add_record(
        "jdoe",
        &["CN=Users,DC=x", "CN=Admins,DC=x", "CN=Ops,DC=x", "CN=Admins,DC=x"],
    );
    env.authenticator.setup(HashMap::from([
        ("CN=Admins,DC=x".to_string(), "admin".to_string()),
        ("CN=Ops,DC=x".to_string(), "operator".to_string()),
    ]));

    let user = env.authenticator.login("jdoe", &password("s3cret")).await?;

    assert_eq!(user.roles, vec!["admin", "operator", "admin"]);

    Ok(())
}

/// Tests that an empty group map yields a successful login with no roles.
#[tokio::test]
async fn test_empty_group_map_yields_no_roles() -> anyhow::Result<()> {
    let env = TestEnv::new(AuthenticatorConfig::new("example.com"));

    let user = env.authenticator.login("jdoe", &password("s3cret")).await?;

    assert!(user.roles.is_empty());

    Ok(())
}

/// Tests that a wrong password fails without touching the directory.
#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    let err = env
        .authenticator
        .login("jdoe", &password("wrong"))
        .await
        .expect_err("wrong password must fail");

    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert_eq!(err.public_message(), "authentication failed");
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Tests that unknown users and wrong passwords look identical to callers.
#[tokio::test]
async fn test_unknown_user_is_indistinguishable() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    let unknown = env
        .authenticator
        .login("nobody", &password("s3cret"))
        .await
        .expect_err("unknown user must fail");
    let wrong = env
        .authenticator
        .login("jdoe", &password("wrong"))
        .await
        .expect_err("wrong password must fail");

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.kind(), wrong.kind());
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Tests that an unreachable realm is reported as invalid credentials.
#[tokio::test]
async fn test_unreachable_realm_fails_verification() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.realm.unreachable.store(true, Ordering::SeqCst);

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("unreachable realm must fail");

    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Tests that a refused ticket is its own error and skips the directory.
#[tokio::test]
async fn test_ticket_refusal_is_ticket_denied() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.realm.deny_tickets.store(true, Ordering::SeqCst);

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("ticket refusal must fail");

    match &err {
        AuthError::TicketDenied { service, .. } => assert_eq!(service, "krbtgt/EXAMPLE.COM"),
        other => panic!("expected TicketDenied, got {other:?}"),
    }
    assert!(err.is_authentication_failure());
    assert_eq!(err.public_message(), "authentication failed");
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Tests that a refused directory session aborts the login.
#[tokio::test]
async fn test_directory_session_refused() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.directory.refuse_sessions.store(true, Ordering::SeqCst);

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("refused session must fail");

    assert!(matches!(err, AuthError::DirectoryUnavailable(_)));
    assert!(err.is_transient());
    assert_eq!(
        err.public_message(),
        "authentication service temporarily unavailable"
    );

    Ok(())
}

/// Tests that a failed lookup aborts the login instead of returning no roles.
#[tokio::test]
async fn test_lookup_error_aborts_login() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.directory.fail_lookups.store(true, Ordering::SeqCst);

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("lookup failure must fail");

    assert!(matches!(err, AuthError::DirectoryUnavailable(_)));
    assert_eq!(env.directory.closes.load(Ordering::SeqCst), 1);

    Ok(())
}

/// Tests that a verified principal without a directory entry cannot log in.
#[tokio::test]
async fn test_missing_record_aborts_login() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    env.realm.add_principal("ghost", "boo");

    let err = env
        .authenticator
        .login("ghost", &password("boo"))
        .await
        .expect_err("missing record must fail");

    match &err {
        AuthError::DirectoryRecordMissing { username } => assert_eq!(username, "ghost"),
        other => panic!("expected DirectoryRecordMissing, got {other:?}"),
    }
    assert!(!err.is_transient());

    Ok(())
}

/// Tests that the verifier sees the upper-cased realm.
#[tokio::test]
async fn test_verifier_receives_normalized_realm() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    env.authenticator.set_realm("example.com");
    env.authenticator.login("jdoe", &password("s3cret")).await?;

    env.authenticator.set_realm("Example.Com");
    env.authenticator.login("jdoe", &password("s3cret")).await?;

    let expected = Realm::new("EXAMPLE.COM");
    assert_eq!(env.realm.realms_seen(), vec![expected.clone(), expected]);

    Ok(())
}

/// Tests that each login gets its own verification context.
#[tokio::test]
async fn test_each_login_gets_fresh_context() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    env.authenticator.login("jdoe", &password("s3cret")).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    env.authenticator.login("jdoe", &password("s3cret")).await?;

    let contexts = env.realm.contexts_seen();
    assert_eq!(contexts.len(), 2);
    assert!(contexts[1] > contexts[0]);

    Ok(())
}

/// Tests that a slow realm is cut off by the verification deadline.
#[tokio::test]
async fn test_verify_timeout() -> anyhow::Result<()> {
    let env = TestEnv::new(
        AuthenticatorConfig::new("example.com").with_verify_timeout(Duration::from_millis(50)),
    );
    env.realm.set_delay(Duration::from_secs(5));

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("slow realm must time out");

    assert!(matches!(
        err,
        AuthError::Timeout {
            stage: LoginStage::Verify
        }
    ));
    assert_eq!(env.directory.opens.load(Ordering::SeqCst), 0);

    Ok(())
}

/// Tests that a slow directory is cut off by the directory deadline.
#[tokio::test]
async fn test_directory_timeout() -> anyhow::Result<()> {
    let env = TestEnv::new(
        AuthenticatorConfig::new("example.com").with_directory_timeout(Duration::from_millis(50)),
    );
    env.directory.set_delay(Duration::from_secs(5));

    let err = env
        .authenticator
        .login("jdoe", &password("s3cret"))
        .await
        .expect_err("slow directory must time out");

    assert!(matches!(
        err,
        AuthError::Timeout {
            stage: LoginStage::Directory
        }
    ));
    assert!(err.is_transient());

    Ok(())
}

/// Tests the audit trail of a successful login.
#[tokio::test]
async fn test_successful_login_events() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    env.authenticator.login("jdoe", &password("s3cret")).await?;

    let events = env.events.events();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(types.first(), Some(&EventType::LoginAttempt));
    assert_eq!(types.last(), Some(&EventType::Login));

    let attempt = events[0].attempt_id;
    assert!(attempt.is_some());
    assert!(events.iter().all(|e| e.attempt_id == attempt));
    assert!(events
        .iter()
        .all(|e| e.realm.as_deref() == Some("EXAMPLE.COM")));

    let login = events.last().expect("login event");
    assert_eq!(login.outcome, EventOutcome::Success);
    assert_eq!(login.detail("roles"), Some("admin"));

    Ok(())
}

/// Tests that a failed login ends with an error event and never records the password.
#[tokio::test]
async fn test_failed_login_events() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();

    let _ = env.authenticator.login("jdoe", &password("hunter2")).await;

    let events = env.events.events();
    assert_eq!(
        env.events.event_types(),
        vec![EventType::LoginAttempt, EventType::LoginError]
    );

    let failure = &events[1];
    assert_eq!(failure.outcome, EventOutcome::Failure);
    assert_eq!(failure.error.as_deref(), Some("invalid_credentials"));

    for event in &events {
        let rendered = format!("{event:?}");
        assert!(!rendered.contains("hunter2"));
    }

    Ok(())
}

/// Tests that the authenticator is usable as a trait object.
#[tokio::test]
async fn test_authenticator_trait_object() -> anyhow::Result<()> {
    let env = TestEnv::with_admin_map();
    let authenticator: &dyn Authenticator = &env.authenticator;

    assert_eq!(authenticator.id(), "directory-authenticator");
    let user = authenticator.login("jdoe", &password("s3cret")).await?;
    assert!(user.has_role("admin"));

    Ok(())
}
