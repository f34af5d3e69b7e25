use crate::services::store::StoreError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Wrong email/password pair. Deliberately identical for an unknown
    /// email and a wrong password so callers cannot enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0} is already taken")]
    DuplicateIdentity(&'static str),

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid identity assertion")]
    AssertionInvalid,

    #[error("Account provisioning failed: {0}")]
    ProvisioningFailed(anyhow::Error),

    #[error("Account not found")]
    AccountNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => {
                AppError::Conflict(anyhow::anyhow!("unique constraint violated"))
            }
            StoreError::Backend(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::DuplicateIdentity(field) => {
                AppError::Conflict(anyhow::anyhow!("{} is already taken", field))
            }
            ServiceError::TokenInvalid | ServiceError::TokenExpired => {
                AppError::AuthError(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::AssertionInvalid => {
                AppError::AuthError(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::ProvisioningFailed(e) => AppError::InternalError(e),
            ServiceError::AccountNotFound => {
                AppError::NotFound(anyhow::anyhow!("Account not found"))
            }
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
