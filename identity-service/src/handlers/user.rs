use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;

use crate::{
    middleware::CurrentUser,
    models::{AccountResponse, UpdateProfileRequest},
    services::{ServiceError, StoreError},
    AppState,
};

/// Current account facts plus granted permission codes.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub permissions: Vec<String>,
}

pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let account = state
        .store
        .find_by_id(context.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    let permissions = state.store.list_permissions(context.account_id).await?;

    Ok(Json(MeResponse {
        account: account.sanitized(),
        permissions,
    }))
}

/// Profile completion: set username and full name.
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    // Empty strings clear a field; uniqueness only applies to real values.
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let full_name = req
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let updated = match state
        .store
        .update_profile(context.account_id, username, full_name)
        .await
    {
        Ok(updated) => updated,
        Err(StoreError::Duplicate) => {
            return Err(ServiceError::DuplicateIdentity("username").into())
        }
        Err(e) => return Err(e.into()),
    };

    let account =
        updated.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    tracing::info!(account_id = %account.account_id, "Profile updated");

    Ok(Json(account.sanitized()))
}
