//! Federated session surface.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use service_core::error::AppError;

use crate::{
    middleware::{CurrentUser, ExternalSubject},
    models::AccountResponse,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct SsoSessionResponse {
    pub account: AccountResponse,
    pub external_subject_id: String,
    pub permissions: Vec<String>,
}

/// Session facts for a federated caller.
///
/// The authentication stage has already verified the assertion and
/// provisioned the account on first contact; this handler only reads.
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(context): CurrentUser,
    Extension(ExternalSubject(subject)): Extension<ExternalSubject>,
) -> Result<Json<SsoSessionResponse>, AppError> {
    let account = state
        .store
        .find_by_id(context.account_id)
        .await?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unauthorized")))?;

    let permissions = state.store.list_permissions(context.account_id).await?;

    Ok(Json(SsoSessionResponse {
        account: account.sanitized(),
        external_subject_id: subject,
        permissions,
    }))
}
