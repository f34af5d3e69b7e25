//! Credential store capability.
//!
//! The store is the single shared mutable resource in the process. All
//! uniqueness (email, external subject, username) is enforced here, not in
//! application code, so concurrent writers resolve races through the
//! store's constraints.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Account;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Callers decide whether
    /// this is a client error (signup) or a recoverable race (provisioning).
    #[error("unique constraint violated")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Email lookups are case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_external_subject(&self, subject: &str)
        -> Result<Option<Account>, StoreError>;

    /// Insert a new account. `StoreError::Duplicate` when any of email,
    /// external subject or username is already taken.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Overwrite the profile-completion fields. `None` clears a field.
    /// Returns the updated account, or `None` for an unknown id.
    async fn update_profile(
        &self,
        account_id: Uuid,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<Option<Account>, StoreError>;

    /// Returns false for an unknown account id.
    async fn update_role(&self, account_id: Uuid, role: &str) -> Result<bool, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn has_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError>;

    /// Idempotent: granting an already-held code is not an error.
    async fn grant_permission(&self, account_id: Uuid, code: &str) -> Result<(), StoreError>;

    /// Returns false when the grant did not exist.
    async fn revoke_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError>;

    async fn list_permissions(&self, account_id: Uuid) -> Result<Vec<String>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// In-memory store for tests.
///
/// A single mutex guards all state, so every insert checks uniqueness and
/// applies atomically, mirroring how the Postgres constraints serialize a
/// provisioning race.
#[derive(Default)]
pub struct MemoryAccountStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    accounts: HashMap<Uuid, Account>,
    grants: HashSet<(Uuid, String)>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts, for assertions on provisioning races.
    pub fn account_count(&self) -> usize {
        self.inner
            .lock()
            .expect("memory store mutex poisoned")
            .accounts
            .len()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("memory store mutex poisoned: {}", e))
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        Ok(inner.accounts.get(&account_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        Ok(inner
            .accounts
            .values()
            .find(|a| {
                a.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn find_by_external_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.external_subject_id.as_deref() == Some(subject))
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(lock_err)?;

        let collides = inner.accounts.values().any(|existing| {
            let email_taken = match (existing.email.as_deref(), account.email.as_deref()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            };
            let subject_taken = existing.external_subject_id.is_some()
                && existing.external_subject_id == account.external_subject_id;
            let username_taken =
                existing.username.is_some() && existing.username == account.username;
            email_taken || subject_taken || username_taken
        });

        if collides || inner.accounts.contains_key(&account.account_id) {
            return Err(StoreError::Duplicate);
        }

        inner.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        let mut inner = self.inner.lock().map_err(lock_err)?;

        if let Some(wanted) = username {
            let taken = inner
                .accounts
                .values()
                .any(|a| a.account_id != account_id && a.username.as_deref() == Some(wanted));
            if taken {
                return Err(StoreError::Duplicate);
            }
        }

        match inner.accounts.get_mut(&account_id) {
            Some(account) => {
                account.username = username.map(|s| s.to_string());
                account.full_name = full_name.map(|s| s.to_string());
                Ok(Some(account.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_role(&self, account_id: Uuid, role: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().map_err(lock_err)?;
        match inner.accounts.get_mut(&account_id) {
            Some(account) => {
                account.role = role.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.created_utc);
        Ok(accounts)
    }

    async fn has_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        Ok(inner.grants.contains(&(account_id, code.to_string())))
    }

    async fn grant_permission(&self, account_id: Uuid, code: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(lock_err)?;
        inner.grants.insert((account_id, code.to_string()));
        Ok(())
    }

    async fn revoke_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().map_err(lock_err)?;
        Ok(inner.grants.remove(&(account_id, code.to_string())))
    }

    async fn list_permissions(&self, account_id: Uuid) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().map_err(lock_err)?;
        let mut codes: Vec<String> = inner
            .grants
            .iter()
            .filter(|(id, _)| *id == account_id)
            .map(|(_, code)| code.clone())
            .collect();
        codes.sort();
        Ok(codes)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
