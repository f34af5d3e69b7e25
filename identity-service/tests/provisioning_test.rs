mod common;

use axum::http::StatusCode;
use common::{request, signup, spawn_app, spawn_app_with_verifier};
use futures::future::join_all;
use identity_service::services::{
    AccountStore, IdentityProvisioner, MemoryAccountStore, StaticAssertionVerifier,
    VerifiedAssertion,
};
use std::collections::HashSet;
use std::sync::Arc;

fn assertion(subject: &str, email: Option<&str>) -> VerifiedAssertion {
    VerifiedAssertion {
        subject: subject.to_string(),
        email: email.map(|e| e.to_string()),
        display_name: Some("Federated Caller".to_string()),
    }
}

#[tokio::test]
async fn concurrent_first_logins_create_exactly_one_account() {
    let store = Arc::new(MemoryAccountStore::new());
    let store_dyn: Arc<dyn AccountStore> = store.clone();
    let provisioner = IdentityProvisioner::new(store_dyn);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let provisioner = provisioner.clone();
            tokio::spawn(async move {
                provisioner
                    .resolve_or_provision(&assertion("sub-race", Some("race@example.com")))
                    .await
            })
        })
        .collect();

    let results = join_all(tasks).await;

    let ids: HashSet<_> = results
        .into_iter()
        .map(|joined| joined.unwrap().expect("resolution must be idempotent"))
        .map(|account| account.account_id)
        .collect();

    // Every caller resolved, all to the same single account
    assert_eq!(ids.len(), 1);
    assert_eq!(store.account_count(), 1);
}

#[tokio::test]
async fn federated_session_provisions_on_first_contact() {
    let verifier = StaticAssertionVerifier::new().with_assertion(
        "good-assertion",
        assertion("ext-sub-9", Some("organizer@example.com")),
    );
    let app = spawn_app_with_verifier(verifier).await;

    let (status, first) = request(&app.app, "GET", "/sso/me", Some("good-assertion"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["external_subject_id"], "ext-sub-9");
    assert_eq!(first["account"]["role"], "user");
    assert_eq!(first["account"]["email"], "organizer@example.com");
    assert_eq!(app.store.account_count(), 1);

    // The second contact resolves to the same account, no new row
    let (status, second) = request(&app.app, "GET", "/sso/me", Some("good-assertion"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["account"]["account_id"], first["account"]["account_id"]);
    assert_eq!(app.store.account_count(), 1);
}

#[tokio::test]
async fn two_simultaneous_federated_logins_share_one_account() {
    let verifier = StaticAssertionVerifier::new()
        .with_assertion("race-assertion", assertion("ext-sub-race", None));
    let app = spawn_app_with_verifier(verifier).await;

    let (a, b) = tokio::join!(
        request(&app.app, "GET", "/sso/me", Some("race-assertion"), None),
        request(&app.app, "GET", "/sso/me", Some("race-assertion"), None),
    );

    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(a.1["account"]["account_id"], b.1["account"]["account_id"]);
    assert_eq!(app.store.account_count(), 1);
}

#[tokio::test]
async fn unknown_assertion_is_unauthorized() {
    let app = spawn_app().await;

    let (status, body) = request(&app.app, "GET", "/sso/me", Some("who-is-this"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = request(&app.app, "GET", "/sso/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authentication_modes_do_not_cross_routes() {
    let verifier = StaticAssertionVerifier::new()
        .with_assertion("good-assertion", assertion("ext-sub-1", None));
    let app = spawn_app_with_verifier(verifier).await;

    // A federated assertion is not a session token
    let (status, _) = request(&app.app, "GET", "/me", Some("good-assertion"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A session token is not a federated assertion
    let (_, token) = signup(&app, "local@example.com", "local-password").await;
    let (status, _) = request(&app.app, "GET", "/sso/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn email_claim_collision_surfaces_as_conflict() {
    let verifier = StaticAssertionVerifier::new().with_assertion(
        "colliding-assertion",
        assertion("ext-sub-2", Some("taken@example.com")),
    );
    let app = spawn_app_with_verifier(verifier).await;

    signup(&app, "taken@example.com", "local-password").await;

    let (status, _) = request(
        &app.app,
        "GET",
        "/sso/me",
        Some("colliding-assertion"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
