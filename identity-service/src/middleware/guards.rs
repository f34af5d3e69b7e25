use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{middleware::AuthContext, models::Role, AppState};

/// Role-hierarchy guard: pass iff the caller's rank meets the minimum.
///
/// A context with a role outside the enumeration ranks 0 and fails every
/// check; a missing context is 401, not a crash.
pub async fn require_role(min: Role, req: Request, next: Next) -> Result<Response, AppError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unauthorized")))?;

    if Role::rank_of(&context.role) >= min.rank() {
        return Ok(next.run(req).await);
    }

    tracing::warn!(
        account_id = %context.account_id,
        role = %context.role,
        required = %min,
        "Insufficient role"
    );
    Err(AppError::Forbidden(anyhow::anyhow!("Insufficient role")))
}

/// Permission-code guard.
///
/// super_admin passes unconditionally; this is the operational escape
/// hatch, so it is checked before touching the store.
pub async fn require_permission(
    State(state): State<AppState>,
    code: &'static str,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unauthorized")))?;

    if permission_allowed(&state, &context, code).await? {
        return Ok(next.run(req).await);
    }

    tracing::warn!(
        account_id = %context.account_id,
        permission = %code,
        "Missing permission"
    );
    Err(AppError::Forbidden(anyhow::anyhow!(
        "Missing permission '{}'",
        code
    )))
}

/// Shared check behind the guard, also callable from handlers that do
/// their own permission checks.
pub async fn permission_allowed(
    state: &AppState,
    context: &AuthContext,
    code: &str,
) -> Result<bool, AppError> {
    if Role::rank_of(&context.role) >= Role::SuperAdmin.rank() {
        return Ok(true);
    }

    Ok(state.store.has_permission(context.account_id, code).await?)
}
