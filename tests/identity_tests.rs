//! Identity contract tests against an in-memory SQLite store.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use usrkit::config::{IdentityConfig, SecurityConfig};
use usrkit::db::Store;
use usrkit::domain::{ActivationKeyStatus, AuthErrorCode, StatusKind};
use usrkit::entities::users;
use usrkit::identity::{
    ActivatedIdentity, AuthOutcome, EditableIdentity, Identity, IdentityContext, IdentityError,
    IdentityLookup, ManagedIdentity, PasswordHistory, Timestamps,
};
use usrkit::security::Argon2Security;

async fn setup_with_policy(policy: IdentityConfig) -> (IdentityContext, Store) {
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store");

    // Cheap parameters keep hashing fast in debug builds.
    let security = Argon2Security::from_config(&SecurityConfig {
        argon2_memory_cost_kib: 64,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    })
    .expect("Invalid test security config");

    let ctx = IdentityContext::new(Arc::new(store.clone()), Arc::new(security), policy);
    (ctx, store)
}

async fn setup() -> (IdentityContext, Store) {
    setup_with_policy(IdentityConfig::default()).await
}

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

async fn register(
    ctx: &IdentityContext,
    username: &str,
    password: &str,
    require_verified_email: bool,
) -> Identity {
    let mut identity = Identity::new();
    identity.set_identity_attributes(&attrs(&[
        ("username", username),
        ("email", &format!("{username}@example.com")),
    ]));
    assert!(
        identity
            .save_identity(ctx, require_verified_email)
            .await
            .unwrap()
    );
    assert!(identity.reset_password(ctx, password).await.unwrap());
    identity
}

async fn reload(ctx: &IdentityContext, identity: &Identity) -> Identity {
    Identity::find_by_id(ctx, identity.id().unwrap())
        .await
        .unwrap()
        .expect("identity should exist")
}

#[tokio::test]
async fn new_identity_gets_auth_key_and_policy_flags() {
    let (ctx, _) = setup().await;

    let identity = register(&ctx, "ann", "correct horse", true).await;

    assert!(!identity.is_new_record());
    assert!(identity.id().is_some());
    assert!(!identity.is_active());
    assert!(!identity.is_verified());
    assert!(!identity.is_disabled());

    let auth_key = identity.auth_key().expect("auth key assigned on insert").to_string();
    assert!(identity.validate_auth_key(&auth_key));
    assert!(!identity.validate_auth_key("something-else"));
    assert!(!identity.validate_auth_key(""));

    let stored = reload(&ctx, &identity).await;
    assert_eq!(stored.auth_key(), Some(auth_key.as_str()));
    assert!(stored.validate_auth_key(&auth_key));
}

#[tokio::test]
async fn save_without_verification_requirement_activates() {
    let (ctx, _) = setup().await;

    let identity = register(&ctx, "bob", "correct horse", false).await;
    assert!(identity.is_active());
    assert!(!identity.is_verified());
}

#[tokio::test]
async fn lookups_match_exactly() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "carol", "correct horse", false).await;

    identity.set_access_token(Some("tok-123".to_string()));
    assert!(identity.toggle_status(&ctx, StatusKind::EmailVerified).await.unwrap());

    let by_name = Identity::find_by_username(&ctx, "carol").await.unwrap();
    assert_eq!(by_name.as_ref().and_then(|i| i.id()), identity.id());
    assert!(Identity::find_by_username(&ctx, "Carol").await.unwrap().is_none());
    assert!(Identity::find_by_username(&ctx, "caro").await.unwrap().is_none());

    let by_token = Identity::find_by_access_token(&ctx, "tok-123", None)
        .await
        .unwrap();
    assert_eq!(by_token.and_then(|i| i.id()), identity.id());
    assert!(
        Identity::find_by_access_token(&ctx, "tok-12", None)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn typed_access_token_lookup_is_unsupported() {
    let (ctx, _) = setup().await;

    let result = Identity::find_by_access_token(&ctx, "tok", Some("bearer")).await;
    assert!(matches!(result, Err(IdentityError::Unsupported(_))));
}

#[tokio::test]
async fn authenticate_checks_inactive_before_disabled_before_password() {
    let (ctx, _) = setup().await;

    // inactive + disabled + wrong password
    let mut identity = register(&ctx, "dave", "correct horse", true).await;
    assert!(identity.toggle_status(&ctx, StatusKind::IsDisabled).await.unwrap());
    assert!(!identity.is_active() && identity.is_disabled());

    let outcome = identity.authenticate(&ctx, "wrong").await.unwrap();
    assert_eq!(outcome.error_code(), Some(AuthErrorCode::Inactive));

    // active + disabled + wrong password
    assert!(identity.toggle_status(&ctx, StatusKind::IsActive).await.unwrap());
    let outcome = identity.authenticate(&ctx, "wrong").await.unwrap();
    assert_eq!(outcome.error_code(), Some(AuthErrorCode::Disabled));

    // active + enabled + wrong password
    assert!(identity.toggle_status(&ctx, StatusKind::IsDisabled).await.unwrap());
    let outcome = identity.authenticate(&ctx, "wrong").await.unwrap();
    let AuthOutcome::Rejected(failure) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(failure.code, AuthErrorCode::Invalid);
    assert_eq!(failure.message, "Invalid username or password.");
    assert!(identity.record().last_visit_on.is_none());
}

#[tokio::test]
async fn successful_authentication_records_last_visit() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "erin", "correct horse", false).await;

    let outcome = identity.authenticate(&ctx, "correct horse").await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authenticated);

    let stored = reload(&ctx, &identity).await;
    assert!(stored.record().last_visit_on.is_some());
    assert_eq!(stored.record().last_visit_on, identity.record().last_visit_on);
}

#[tokio::test]
async fn placeholder_password_never_authenticates() {
    let (ctx, _) = setup().await;

    let mut identity = Identity::new();
    identity.set_identity_attributes(&attrs(&[("username", "fay"), ("email", "fay@x.io")]));
    assert!(identity.save_identity(&ctx, false).await.unwrap());

    for guess in ["", "x"] {
        let outcome = identity.authenticate(&ctx, guess).await.unwrap();
        assert_eq!(outcome.error_code(), Some(AuthErrorCode::Invalid));
    }
}

#[tokio::test]
async fn verify_email_is_idempotent_and_activates_when_required() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "gus", "correct horse", true).await;
    assert!(!identity.is_active() && !identity.is_verified());

    assert!(identity.verify_email(&ctx, true).await.unwrap());
    assert!(identity.is_active() && identity.is_verified());

    let before = reload(&ctx, &identity).await;
    assert!(identity.verify_email(&ctx, true).await.unwrap());
    let after = reload(&ctx, &identity).await;

    assert!(after.is_verified());
    assert_eq!(before, after);
}

#[tokio::test]
async fn verify_email_without_requirement_leaves_active_flag() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "hal", "correct horse", true).await;

    assert!(identity.verify_email(&ctx, false).await.unwrap());
    assert!(identity.is_verified());
    assert!(!identity.is_active());
}

#[tokio::test]
async fn toggle_status_flips_exactly_one_flag() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "ivy", "correct horse", false).await;

    let (verified, disabled) = (identity.is_verified(), identity.is_disabled());
    assert!(identity.is_active());

    assert!(identity.toggle_status(&ctx, StatusKind::IsActive).await.unwrap());

    let stored = reload(&ctx, &identity).await;
    assert!(!stored.is_active());
    assert_eq!(stored.is_verified(), verified);
    assert_eq!(stored.is_disabled(), disabled);

    assert!(identity.toggle_status(&ctx, StatusKind::IsActive).await.unwrap());
    assert!(reload(&ctx, &identity).await.is_active());
}

#[tokio::test]
async fn only_latest_activation_key_verifies() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "jan", "correct horse", true).await;

    let first = identity.generate_activation_key(&ctx).await.unwrap().unwrap();
    let second = identity.generate_activation_key(&ctx).await.unwrap().unwrap();
    assert_ne!(first, second);

    let stored = reload(&ctx, &identity).await;
    assert_eq!(
        stored.verify_activation_key(&ctx, &second),
        ActivationKeyStatus::None
    );
    assert_eq!(
        stored.verify_activation_key(&ctx, &first),
        ActivationKeyStatus::Invalid
    );

    // verification never mutates
    assert_eq!(reload(&ctx, &identity).await, stored);
}

#[tokio::test]
async fn activation_key_ttl_reports_too_old() {
    let policy = IdentityConfig {
        activation_key_ttl_minutes: Some(60),
        ..IdentityConfig::default()
    };
    let (ctx, store) = setup_with_policy(policy).await;
    let mut identity = register(&ctx, "kim", "correct horse", true).await;
    let key = identity.generate_activation_key(&ctx).await.unwrap().unwrap();

    assert_eq!(identity.verify_activation_key(&ctx, &key), ActivationKeyStatus::None);

    users::Entity::update_many()
        .col_expr(
            users::Column::ActivationKeyOn,
            Expr::value("2000-01-01 00:00:00"),
        )
        .filter(users::Column::Username.eq("kim"))
        .exec(&store.conn)
        .await
        .unwrap();

    let stale = reload(&ctx, &identity).await;
    assert_eq!(stale.verify_activation_key(&ctx, &key), ActivationKeyStatus::TooOld);
    assert_eq!(stale.verify_activation_key(&ctx, "nope"), ActivationKeyStatus::Invalid);
}

#[tokio::test]
async fn duplicate_username_or_email_fails_validation() {
    let (ctx, _) = setup().await;
    register(&ctx, "lee", "correct horse", false).await;

    let mut same_name = Identity::new();
    same_name.set_identity_attributes(&attrs(&[("username", "lee"), ("email", "other@x.io")]));
    assert!(!same_name.save_identity(&ctx, false).await.unwrap());
    assert!(same_name.is_new_record());

    let mut same_email = Identity::new();
    same_email.set_identity_attributes(&attrs(&[
        ("username", "lee2"),
        ("email", "lee@example.com"),
    ]));
    assert!(!same_email.save_identity(&ctx, false).await.unwrap());

    let mut blank = Identity::new();
    blank.set_identity_attributes(&attrs(&[("username", "   "), ("email", "b@x.io")]));
    assert!(!blank.save_identity(&ctx, false).await.unwrap());
}

#[tokio::test]
async fn saving_trims_profile_fields() {
    let (ctx, _) = setup().await;

    let mut identity = Identity::new();
    identity.set_identity_attributes(&attrs(&[
        ("username", "  max "),
        ("email", "max@x.io"),
        ("firstName", " Max "),
        ("lastName", "  "),
    ]));
    assert!(identity.save_identity(&ctx, false).await.unwrap());

    assert_eq!(identity.username(), "max");
    assert_eq!(identity.first_name(), Some("Max"));
    assert_eq!(identity.last_name(), None);
}

#[tokio::test]
async fn password_history_tracks_previous_passwords() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "ned", "first password", false).await;

    let first_set_on = identity.password_date(&ctx, None).await.unwrap();
    assert!(first_set_on.is_some());

    assert!(identity.reset_password(&ctx, "second password").await.unwrap());

    assert!(identity.verify_password(&ctx, "second password").await);
    assert!(!identity.verify_password(&ctx, "first password").await);

    assert_eq!(
        identity.password_date(&ctx, Some("first password")).await.unwrap(),
        first_set_on
    );
    assert_eq!(
        identity.password_date(&ctx, Some("second password")).await.unwrap(),
        identity.record().password_set_on
    );
    assert_eq!(
        identity.password_date(&ctx, Some("never used")).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn failed_history_write_keeps_previous_password() {
    let (ctx, store) = setup().await;
    let mut identity = register(&ctx, "pia", "first password", false).await;
    let first_set_on = identity.record().password_set_on.clone();

    store
        .conn
        .execute_unprepared("DROP TABLE password_history")
        .await
        .unwrap();

    assert!(identity.reset_password(&ctx, "second password").await.is_err());

    // in memory
    assert!(identity.verify_password(&ctx, "first password").await);
    assert_eq!(identity.record().password_set_on, first_set_on);

    // stored row
    let stored = reload(&ctx, &identity).await;
    assert!(stored.verify_password(&ctx, "first password").await);
    assert!(!stored.verify_password(&ctx, "second password").await);
    assert_eq!(stored.record().password_set_on, first_set_on);
}

#[tokio::test]
async fn email_change_keeps_verification_by_default() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "ola", "correct horse", true).await;
    assert!(identity.verify_email(&ctx, true).await.unwrap());

    identity.set_identity_attributes(&attrs(&[("email", "ola@new.example")]));
    assert!(identity.save_identity(&ctx, true).await.unwrap());

    assert!(identity.is_verified());
    assert!(identity.is_active());
}

#[tokio::test]
async fn email_change_can_require_reverification() {
    let policy = IdentityConfig {
        reverify_on_email_change: true,
        ..IdentityConfig::default()
    };
    let (ctx, _) = setup_with_policy(policy).await;
    let mut identity = register(&ctx, "pia", "correct horse", true).await;
    assert!(identity.verify_email(&ctx, true).await.unwrap());

    // unchanged email keeps the flag
    identity.set_identity_attributes(&attrs(&[("firstName", "Pia")]));
    assert!(identity.save_identity(&ctx, true).await.unwrap());
    assert!(identity.is_verified());

    identity.set_identity_attributes(&attrs(&[("email", "pia@new.example")]));
    assert!(identity.save_identity(&ctx, true).await.unwrap());
    assert!(!identity.is_verified());
    assert!(!identity.is_active());
}

#[tokio::test]
async fn timestamps_follow_lifecycle() {
    let (ctx, _) = setup().await;
    let mut identity = register(&ctx, "quin", "correct horse", false).await;

    let Timestamps::Single(created) = identity.timestamps(Some("createdOn")) else {
        panic!("createdOn is a known key");
    };
    assert!(created.is_some());
    assert_eq!(identity.timestamps(Some("lastVisitOn")), Timestamps::Single(None));

    identity.authenticate(&ctx, "correct horse").await.unwrap();
    let Timestamps::All(all) = identity.timestamps(None) else {
        panic!("expected all timestamps");
    };
    assert!(all["lastVisitOn"].is_some());
    assert!(all["passwordSetOn"].is_some());
    assert!(all["updatedOn"].is_some());
}
