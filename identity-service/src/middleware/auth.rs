use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{services::ServiceError, AppState};

/// Identity facts attached to the request once authentication succeeds.
/// Immutable from then on; later stages and handlers only read it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub role: String,
}

pub(crate) fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string())
}

/// Session-token authentication stage.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| {
        AppError::AuthError(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let claims = match state.jwt.verify(&token) {
        Ok(claims) => claims,
        Err(ServiceError::TokenExpired) => {
            tracing::debug!("Session token expired");
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Invalid or expired token"
            )));
        }
        Err(_) => {
            tracing::debug!("Session token rejected");
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Invalid or expired token"
            )));
        }
    };

    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired token")))?;

    req.extensions_mut().insert(AuthContext {
        account_id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

/// Extractor for handlers running behind an authentication stage.
pub struct CurrentUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<AuthContext>()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unauthorized")))?;

        Ok(CurrentUser(context.clone()))
    }
}
