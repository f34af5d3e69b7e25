pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::{Request, State},
    middleware::{from_fn, from_fn_with_state, Next},
    routing::{delete, get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::middleware::{auth_middleware, federated_auth_middleware, require_permission, require_role};
use crate::models::Role;
use crate::services::{
    AccountStore, AssertionVerifier, AuthService, IdentityProvisioner, JwtService,
};

/// Permission code gating the permission-management surface itself.
/// super_admin bypasses it, which is the bootstrap path for the first grant.
pub const PERMISSION_MANAGE: &str = "permission.manage";

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::signup,
        handlers::auth::login,
    ),
    components(
        schemas(
            models::SignupRequest,
            models::LoginRequest,
            models::UpdateProfileRequest,
            models::UpdateRoleRequest,
            models::GrantPermissionRequest,
            models::AccountResponse,
            models::SessionTokenResponse,
            models::AuthResponse,
            models::PermissionListResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Account signup, login and session tokens"),
        (name = "Observability", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn AccountStore>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub verifier: Arc<dyn AssertionVerifier>,
    pub provisioner: IdentityProvisioner,
    pub login_rate_limiter: IpRateLimiter,
    pub signup_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login/signup carry their own, tighter limiters on top of the global one
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let signup_limiter = state.signup_rate_limiter.clone();
    let signup_route = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(signup_limiter, ip_rate_limit_middleware));

    // Routes for callers holding a locally issued session token
    let session_routes = Router::new()
        .route(
            "/me",
            get(handlers::user::get_me).patch(handlers::user::update_me),
        )
        .route("/authz/check", get(handlers::authz::check))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    // Routes for callers presenting a federated identity assertion
    let sso_routes = Router::new()
        .route("/sso/me", get(handlers::sso::get_session))
        .layer(from_fn_with_state(state.clone(), federated_auth_middleware));

    // Role management: super_admin on top of the admin gate below
    let role_routes = Router::new()
        .route(
            "/admin/users/:id/role",
            axum::routing::patch(handlers::admin::update_role),
        )
        .layer(from_fn(|req: Request, next: Next| {
            require_role(Role::SuperAdmin, req, next)
        }));

    // Permission management: admin gate below plus an explicit capability
    let permission_routes = Router::new()
        .route(
            "/admin/users/:id/permissions",
            get(handlers::admin::list_account_permissions).post(handlers::admin::grant_permission),
        )
        .route(
            "/admin/users/:id/permissions/:code",
            delete(handlers::admin::revoke_permission),
        )
        .layer(from_fn_with_state(
            state.clone(),
            |state: State<AppState>, req: Request, next: Next| {
                require_permission(state, PERMISSION_MANAGE, req, next)
            },
        ));

    let admin_routes = Router::new()
        .route("/admin/users", get(handlers::admin::list_accounts))
        .merge(role_routes)
        .merge(permission_routes)
        .layer(from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut app = Router::new().route("/health", get(health_check));

    if state.config.swagger.enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = app
        .merge(login_route)
        .merge(signup_route)
        .merge(session_routes)
        .merge(sso_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
