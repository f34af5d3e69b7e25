use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::middleware::auth::{bearer_token, AuthContext};
use crate::AppState;

/// The caller's stable subject id at the federated provider. Attached on
/// the federated path only.
#[derive(Debug, Clone)]
pub struct ExternalSubject(pub String);

/// Federated authentication stage.
///
/// The provider's verification of the assertion is the authentication
/// event; an unknown subject is provisioned on the spot so the context
/// always carries an account id downstream.
pub async fn federated_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let assertion = bearer_token(&req).ok_or_else(|| {
        AppError::AuthError(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let verified = state.verifier.verify_assertion(&assertion).await?;

    let account = state.provisioner.resolve_or_provision(&verified).await?;

    req.extensions_mut().insert(AuthContext {
        account_id: account.account_id,
        role: account.role.clone(),
    });
    req.extensions_mut().insert(ExternalSubject(verified.subject));

    Ok(next.run(req).await)
}
