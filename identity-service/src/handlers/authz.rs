use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::{
    middleware::{permission_allowed, CurrentUser},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct AuthzCheckQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct AuthzCheckResponse {
    pub allowed: bool,
    pub code: String,
}

/// Capability self-check for the calling account, including the
/// super_admin bypass. Lets handlers and clients ask "may I?" without
/// attempting the guarded operation.
pub async fn check(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Query(query): Query<AuthzCheckQuery>,
) -> Result<Json<AuthzCheckResponse>, AppError> {
    let allowed = permission_allowed(&state, &context, &query.code).await?;

    Ok(Json(AuthzCheckResponse {
        allowed,
        code: query.code,
    }))
}
