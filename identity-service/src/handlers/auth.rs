use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    models::{AuthResponse, LoginRequest, SessionTokenResponse, SignupRequest},
    AppState,
};

/// Register a new account with a local credential.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, session token issued", body = AuthResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation error")
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    req.validate()?;

    let (account, token) = state.auth.signup(req).await?;
    let session = SessionTokenResponse::new(token, state.auth.session_ttl_seconds());

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            account: account.sanitized(),
            session,
        }),
    ))
}

/// Log in with email/password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    req.validate()?;

    let (account, token) = state.auth.login(req).await?;
    let session = SessionTokenResponse::new(token, state.auth.session_ttl_seconds());

    Ok(Json(AuthResponse {
        account: account.sanitized(),
        session,
    }))
}
