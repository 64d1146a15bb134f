//! Public authentication endpoints, plus logout behind the strict gate.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::dto::{self, AuthResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, blocking};
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState};

pub fn router(auth_state: AuthState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route_layer(axum::middleware::from_fn_with_state(auth_state, middleware::require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
}

/// POST /api/v1/auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::body(payload)?;
    let out = blocking(move || services.auth.register(req.into())).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(out))))
}

/// POST /api/v1/auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::body(payload)?;
    let out = blocking(move || services.auth.login(&req.email, &req.password)).await?;
    Ok(Json(AuthResponse::from(out)))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::body(payload)?;
    let out = blocking(move || services.auth.refresh(&req.refresh_token)).await?;
    Ok(Json(AuthResponse::from(out)))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> impl IntoResponse {
    services.auth.logout(identity.user_id());
    Json(MessageResponse::new("logged out successfully"))
}
