//! Admin routes for role assignment, account status and RBAC inspection.
//!
//! Every route sits behind the strict auth gate followed by a permission gate.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use gatehouse_auth::{Explanation, PermissionKey};
use gatehouse_core::{AppError, RoleId, UserId};

use crate::app::dto::{self, AssignRoleRequest, RoleResponse, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, blocking};
use crate::authz::{self, PermissionGate, SharedResolver};
use crate::middleware::{self, AuthState};

// ─────────────────────────────────────────────────────────────────────────────
// Query / Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    /// `resource:action`
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub user_id: UserId,
    pub permissions: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router(auth_state: AuthState, resolver: SharedResolver) -> Router {
    let role_assignment = Router::new()
        .route("/users/:id/roles", post(assign_role))
        .route("/users/:id/roles/:role_id", delete(remove_role))
        .route_layer(axum::middleware::from_fn_with_state(
            PermissionGate::require(resolver.clone(), "users", "write"),
            authz::require_permissions,
        ));

    let account_status = Router::new()
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/users/:id/activate", post(activate_user))
        .route_layer(axum::middleware::from_fn_with_state(
            PermissionGate::require_any(resolver.clone(), &[("users", "write"), ("users", "delete")]),
            authz::require_permissions,
        ));

    let roles = Router::new()
        .route("/roles", get(list_roles))
        .route_layer(axum::middleware::from_fn_with_state(
            PermissionGate::require_any(resolver.clone(), &[("roles", "read"), ("roles", "write")]),
            authz::require_permissions,
        ));

    let inspection = Router::new()
        .route("/users/:id/permissions", get(effective_permissions))
        .route("/users/:id/explain", get(explain_permission))
        .route_layer(axum::middleware::from_fn_with_state(
            PermissionGate::require(resolver, "users", "read"),
            authz::require_permissions,
        ));

    Router::new()
        .merge(role_assignment)
        .merge(account_status)
        .merge(roles)
        .merge(inspection)
        .route_layer(axum::middleware::from_fn_with_state(auth_state, middleware::require_auth))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    Ok(raw.parse::<UserId>()?)
}

fn parse_role_id(raw: &str) -> Result<RoleId, ApiError> {
    Ok(raw.parse::<RoleId>()?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/admin/users/:id/roles
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let req = dto::body(payload)?;
    let user = blocking(move || services.accounts.assign_role(user_id, req.role_id)).await?;
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/v1/admin/users/:id/roles/:role_id
pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, role_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let role_id = parse_role_id(&role_id)?;
    let user = blocking(move || services.accounts.remove_role(user_id, role_id)).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/v1/admin/users/:id/deactivate
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    set_active(services, &id, false).await
}

/// POST /api/v1/admin/users/:id/activate
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    set_active(services, &id, true).await
}

async fn set_active(services: Arc<AppServices>, id: &str, active: bool) -> Result<Json<UserResponse>, ApiError> {
    let user_id = parse_user_id(id)?;
    let user = blocking(move || services.accounts.set_active(user_id, active)).await?;
    Ok(Json(UserResponse::from(user)))
}

/// GET /api/v1/admin/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    let roles = blocking(move || services.accounts.list_roles()).await?;
    let roles: Vec<RoleResponse> = roles.into_iter().map(RoleResponse::from).collect();
    Ok(Json(serde_json::json!({ "roles": roles })))
}

/// GET /api/v1/admin/users/:id/permissions
pub async fn effective_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let set = blocking(move || Ok(services.resolver.permissions_of_user(user_id)?)).await?;
    Ok(Json(EffectivePermissionsResponse {
        user_id,
        permissions: set.keys().map(|k| k.to_string()).collect(),
    }))
}

/// GET /api/v1/admin/users/:id/explain?permission=resource:action
pub async fn explain_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<ExplainQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let Ok(Query(query)) = query else {
        return Err(AppError::validation("permission query parameter required").into());
    };
    let key: PermissionKey = query.permission.parse()?;
    let explanation: Explanation = blocking(move || {
        services
            .resolver
            .explain(user_id, &key)?
            .ok_or_else(|| AppError::not_found("user not found"))
    })
    .await?;
    Ok(Json(explanation))
}
