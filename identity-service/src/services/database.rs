//! PostgreSQL credential store.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{Account, PermissionGrant};
use crate::services::store::{AccountStore, StoreError};

/// Credential store backed by a pooled Postgres connection.
///
/// Uniqueness on email, external subject and username comes from partial
/// unique indexes (NULLs never collide); a violated constraint surfaces as
/// `StoreError::Duplicate`.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
        other => StoreError::Backend(anyhow::anyhow!(other)),
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn find_by_external_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE external_subject_id = $1")
            .bind(subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, email, password_hash, external_subject_id, username, full_name, role, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.account_id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.external_subject_id)
        .bind(&account.username)
        .bind(&account.full_name)
        .bind(&account.role)
        .bind(account.created_utc)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET username = $2, full_name = $3
            WHERE account_id = $1
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(username)
        .bind(full_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn update_role(&self, account_id: Uuid, role: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE accounts SET role = $2 WHERE account_id = $1")
            .bind(account_id)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_utc")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn has_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM account_permissions WHERE account_id = $1 AND permission_code = $2",
        )
        .bind(account_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(row.is_some())
    }

    async fn grant_permission(&self, account_id: Uuid, code: &str) -> Result<(), StoreError> {
        let grant = PermissionGrant::new(account_id, code.to_string());
        sqlx::query(
            r#"
            INSERT INTO account_permissions (account_id, permission_code, granted_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, permission_code) DO NOTHING
            "#,
        )
        .bind(grant.account_id)
        .bind(&grant.permission_code)
        .bind(grant.granted_utc)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn revoke_permission(&self, account_id: Uuid, code: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM account_permissions WHERE account_id = $1 AND permission_code = $2",
        )
        .bind(account_id)
        .bind(code)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_permissions(&self, account_id: Uuid) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT permission_code FROM account_permissions WHERE account_id = $1 ORDER BY permission_code",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                StoreError::Backend(anyhow::anyhow!(e))
            })?;
        Ok(())
    }
}
