use std::sync::Arc;

use crate::{
    models::{Account, LoginRequest, SignupRequest},
    services::{
        store::{AccountStore, StoreError},
        JwtService, ServiceError,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Local-credential authentication: signup and login.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    /// Register a new account with role `user` and issue its first session
    /// token. The email uniqueness check is the store's constraint, not a
    /// read-then-write, so concurrent signups cannot both succeed.
    pub async fn signup(&self, req: SignupRequest) -> Result<(Account, String), ServiceError> {
        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        let account = Account::new_local(req.email, password_hash.into_string());

        match self.store.insert_account(&account).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => return Err(ServiceError::DuplicateIdentity("email")),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(account_id = %account.account_id, "Account registered");

        let token = self.jwt.issue(account.account_id, &account.role)?;
        Ok((account, token))
    }

    /// Authenticate with email/password and issue a session token.
    ///
    /// Unknown email, federation-only account and wrong password all fail
    /// with the same `InvalidCredentials`.
    pub async fn login(&self, req: LoginRequest) -> Result<(Account, String), ServiceError> {
        let account = self
            .store
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let hash = account
            .password_hash
            .clone()
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&Password::new(req.password), &PasswordHashString::new(hash)) {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.jwt.issue(account.account_id, &account.role)?;
        tracing::info!(account_id = %account.account_id, "Account logged in");

        Ok((account, token))
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.jwt.session_ttl_seconds()
    }
}
