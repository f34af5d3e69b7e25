mod common;

use axum::http::StatusCode;
use common::{request, signup, spawn_app};
use serde_json::json;

#[tokio::test]
async fn signup_returns_token_resolving_to_the_new_account() {
    let app = spawn_app().await;

    let (status, body) = request(
        &app.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "organizer@example.com", "password": "hunter2-plus" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account"]["role"], "user");
    assert_eq!(body["account"]["email"], "organizer@example.com");
    assert!(body["account"].get("password_hash").is_none());
    assert_eq!(body["session"]["token_type"], "Bearer");

    // The issued token authenticates as the same account
    let token = body["session"]["token"].as_str().unwrap();
    let (status, me) = request(&app.app, "GET", "/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["account_id"], body["account"]["account_id"]);
    assert_eq!(me["role"], "user");
}

#[tokio::test]
async fn signup_with_taken_email_is_a_conflict() {
    let app = spawn_app().await;
    signup(&app, "vendor@example.com", "first-password").await;

    let (status, body) = request(
        &app.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "vendor@example.com", "password": "second-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn signup_rejects_invalid_payload() {
    let app = spawn_app().await;

    let (status, _) = request(
        &app.app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "not-an-email", "password": "long-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "vendor@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_with_correct_password_succeeds() {
    let app = spawn_app().await;
    let (account_id, _) = signup(&app, "vendor@example.com", "correct-password").await;

    let (status, body) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "vendor@example.com", "password": "correct-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["account_id"], account_id.as_str());

    let token = body["session"]["token"].as_str().unwrap();
    let (status, me) = request(&app.app, "GET", "/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["account_id"], account_id.as_str());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    signup(&app, "vendor@example.com", "correct-password").await;

    let (wrong_pw_status, wrong_pw_body) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "vendor@example.com", "password": "wrong-password" })),
    )
    .await;

    let (no_account_status, no_account_body) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "whatever-here" })),
    )
    .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(no_account_status, StatusCode::UNAUTHORIZED);
    // Identical response for "wrong password" and "no such account"
    assert_eq!(wrong_pw_body, no_account_body);
}

#[tokio::test]
async fn login_on_federation_only_account_fails_like_any_bad_credential() {
    let app = spawn_app().await;
    signup(&app, "vendor@example.com", "correct-password").await;

    let federated = identity_service::models::Account::new_federated(
        "ext-sub-1".to_string(),
        Some("sso-only@example.com".to_string()),
        None,
    );
    app.state.store.insert_account(&federated).await.unwrap();

    let (status, body) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "sso-only@example.com", "password": "anything-goes" })),
    )
    .await;

    let (_, reference_body) = request(
        &app.app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "anything-goes" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, reference_body);
}

#[tokio::test]
async fn profile_completion_sets_username_and_enforces_uniqueness() {
    let app = spawn_app().await;
    let (_, first_token) = signup(&app, "first@example.com", "first-password").await;
    let (_, second_token) = signup(&app, "second@example.com", "second-password").await;

    let (status, body) = request(
        &app.app,
        "PATCH",
        "/me",
        Some(&first_token),
        Some(json!({ "username": "stall42", "full_name": "First Vendor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "stall42");
    assert_eq!(body["full_name"], "First Vendor");

    let (status, _) = request(
        &app.app,
        "PATCH",
        "/me",
        Some(&second_token),
        Some(json!({ "username": "stall42" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Empty strings clear instead of storing ""
    let (status, body) = request(
        &app.app,
        "PATCH",
        "/me",
        Some(&first_token),
        Some(json!({ "username": "", "full_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["username"].is_null());

    // A second account may now take the freed username
    let (status, _) = request(
        &app.app,
        "PATCH",
        "/me",
        Some(&second_token),
        Some(json!({ "username": "stall42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
