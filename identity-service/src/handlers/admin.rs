//! Administrative surface: account listing, role management and
//! permission grants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        AccountResponse, GrantPermissionRequest, PermissionListResponse, Role, UpdateRoleRequest,
    },
    AppState,
};

pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state.store.list_accounts().await?;
    Ok(Json(
        accounts.into_iter().map(AccountResponse::from).collect(),
    ))
}

/// Change an account's role.
///
/// The route is super_admin-gated; on top of that a super_admin's own tier
/// cannot be changed through this endpoint. The new role takes effect on
/// the target's next token issuance.
pub async fn update_role(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let target = state
        .store
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    if target.is_super_admin() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Cannot change role of super_admin"
        )));
    }

    state.store.update_role(account_id, role.as_str()).await?;

    tracing::info!(account_id = %account_id, role = %role, "Role updated");

    Ok(Json(serde_json::json!({
        "message": "Role updated successfully"
    })))
}

pub async fn grant_permission(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<(StatusCode, Json<PermissionListResponse>), AppError> {
    req.validate()?;

    state
        .store
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    state.store.grant_permission(account_id, &req.code).await?;

    tracing::info!(account_id = %account_id, permission = %req.code, "Permission granted");

    let permissions = state.store.list_permissions(account_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(PermissionListResponse {
            account_id,
            permissions,
        }),
    ))
}

pub async fn revoke_permission(
    State(state): State<AppState>,
    Path((account_id, code)): Path<(Uuid, String)>,
) -> Result<Json<PermissionListResponse>, AppError> {
    let removed = state.store.revoke_permission(account_id, &code).await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Permission grant not found"
        )));
    }

    tracing::info!(account_id = %account_id, permission = %code, "Permission revoked");

    let permissions = state.store.list_permissions(account_id).await?;
    Ok(Json(PermissionListResponse {
        account_id,
        permissions,
    }))
}

pub async fn list_account_permissions(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<PermissionListResponse>, AppError> {
    state
        .store
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    let permissions = state.store.list_permissions(account_id).await?;
    Ok(Json(PermissionListResponse {
        account_id,
        permissions,
    }))
}
