#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use identity_service::{
    build_router,
    config::{
        AppConfig, DatabaseConfig, Environment, GoogleConfig, JwtConfig, RateLimitConfig,
        SecurityConfig, SwaggerConfig,
    },
    models::{Account, Role},
    services::{
        AccountStore, AssertionVerifier, AuthService, IdentityProvisioner, JwtService,
        MemoryAccountStore, StaticAssertionVerifier,
    },
    AppState,
};
use service_core::config as core_config;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tower::util::ServiceExt;

pub fn test_config() -> AppConfig {
    AppConfig {
        common: core_config::Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/identity_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            session_ttl_hours: 24,
        },
        google: GoogleConfig {
            client_id: "test-client".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig { enabled: false },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            signup_attempts: 1000,
            signup_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryAccountStore>,
}

/// Build the real router on top of the in-memory store and a verifier that
/// accepts no assertions.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_verifier(StaticAssertionVerifier::new()).await
}

pub async fn spawn_app_with_verifier(verifier: StaticAssertionVerifier) -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryAccountStore::new());
    let store_dyn: Arc<dyn AccountStore> = store.clone();

    let jwt = JwtService::new(&config.jwt);
    let auth = AuthService::new(store_dyn.clone(), jwt.clone());
    let provisioner = IdentityProvisioner::new(store_dyn.clone());
    let verifier: Arc<dyn AssertionVerifier> = Arc::new(verifier);

    let state = AppState {
        config,
        store: store_dyn,
        jwt,
        auth,
        verifier,
        provisioner,
        login_rate_limiter: create_ip_rate_limiter(1000, 60),
        signup_rate_limiter: create_ip_rate_limiter(1000, 60),
        ip_rate_limiter: create_ip_rate_limiter(10_000, 60),
    };

    let app = build_router(state.clone())
        .await
        .expect("Failed to build router");

    TestApp { app, state, store }
}

/// Drive one request through the router and decode the JSON body.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Insert an account with the given role directly and issue a matching
/// session token. The password hash is a placeholder; use the signup
/// endpoint for accounts that need to log in.
pub async fn seed_account(app: &TestApp, email: &str, role: Role) -> (Account, String) {
    let mut account = Account::new_local(email.to_string(), "seeded-placeholder".to_string());
    account.role = role.as_str().to_string();
    app.state.store.insert_account(&account).await.unwrap();

    let token = app.state.jwt.issue(account.account_id, &account.role).unwrap();
    (account, token)
}

/// Sign up through the API and return (account_id, token).
pub async fn signup(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let (status, body) = request(
        &app.app,
        "POST",
        "/auth/signup",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    let account_id = body["account"]["account_id"].as_str().unwrap().to_string();
    let token = body["session"]["token"].as_str().unwrap().to_string();
    (account_id, token)
}
