//! Request pipeline: authentication stages and authorization guards.
//!
//! Stages run strictly in order per request: authenticate, context attach,
//! role guard, permission guard. A failing stage terminates the pipeline;
//! nothing downstream executes.

mod auth;
mod federated;
mod guards;

pub use auth::{auth_middleware, AuthContext, CurrentUser};
pub use federated::{federated_auth_middleware, ExternalSubject};
pub use guards::{permission_allowed, require_permission, require_role};
