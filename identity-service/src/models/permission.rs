//! Permission grant model - fine-grained capability codes per account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A capability code granted to one account, e.g. `vendor.verify`.
/// Codes are unique per account; insertion order is irrelevant.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionGrant {
    pub account_id: Uuid,
    pub permission_code: String,
    pub granted_utc: DateTime<Utc>,
}

impl PermissionGrant {
    pub fn new(account_id: Uuid, permission_code: String) -> Self {
        Self {
            account_id,
            permission_code,
            granted_utc: Utc::now(),
        }
    }
}

/// Request to grant a permission code.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GrantPermissionRequest {
    #[validate(length(min = 1, max = 128))]
    pub code: String,
}

/// Permission codes held by an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionListResponse {
    pub account_id: Uuid,
    pub permissions: Vec<String>,
}
