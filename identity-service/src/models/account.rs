//! Account model - the durable identity record for every marketplace caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Privilege tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Staff,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Rank in the fixed hierarchy: user=1, staff=2, admin=3, super_admin=4.
    ///
    /// Strings outside the enumeration rank 0, below `user`, so they can
    /// never satisfy a role guard.
    pub fn rank_of(role: &str) -> u8 {
        match role {
            "super_admin" => 4,
            "admin" => 3,
            "staff" => 2,
            "user" => 1,
            _ => 0,
        }
    }

    pub fn rank(self) -> u8 {
        Self::rank_of(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account entity.
///
/// `email`, `external_subject_id` and `username` are each unique when
/// present; they are stored as NULL (never empty strings) when absent so
/// the uniqueness constraints cannot collide on "".
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub external_subject_id: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    /// Create an account from a local credential signup.
    pub fn new_local(email: String, password_hash: String) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            email: Some(email),
            password_hash: Some(password_hash),
            external_subject_id: None,
            username: None,
            full_name: None,
            role: Role::User.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Create an account from a first federated login.
    pub fn new_federated(
        external_subject_id: String,
        email: Option<String>,
        full_name: Option<String>,
    ) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            email: email.filter(|e| !e.is_empty()),
            password_hash: None,
            external_subject_id: Some(external_subject_id),
            username: None,
            full_name,
            role: Role::User.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin.as_str()
    }

    /// Convert to a response without sensitive fields.
    pub fn sanitized(&self) -> AccountResponse {
        AccountResponse::from(self.clone())
    }
}

/// Request to sign up with email/password.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Request to log in with email/password.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Profile completion request. Empty strings clear the field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// Role change request (super_admin surface).
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Account response for the API (no credential material).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            account_id: a.account_id,
            email: a.email,
            username: a.username,
            full_name: a.full_name,
            role: a.role,
            created_utc: a.created_utc,
        }
    }
}

/// Session token response after successful auth.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionTokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl SessionTokenResponse {
    pub fn new(token: String, expires_in: i64) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Auth response with account info and session token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub account: AccountResponse,
    pub session: SessionTokenResponse,
}
