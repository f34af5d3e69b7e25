//! Data models for the identity core.

mod account;
mod permission;

pub use account::{
    Account, AccountResponse, AuthResponse, LoginRequest, Role, SessionTokenResponse,
    SignupRequest, UpdateProfileRequest, UpdateRoleRequest,
};
pub use permission::{GrantPermissionRequest, PermissionGrant, PermissionListResponse};
