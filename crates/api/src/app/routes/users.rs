//! Self-service account endpoints for the authenticated caller.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::dto::{self, ChangePasswordRequest, MessageResponse, UpdateProfileRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, blocking};
use crate::context::IdentityContext;
use crate::middleware::{self, AuthState};

pub fn router(auth_state: AuthState) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route_layer(axum::middleware::from_fn_with_state(auth_state, middleware::require_auth))
}

/// GET /api/v1/user/profile
pub async fn get_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.user_id();
    let user = blocking(move || services.accounts.get_profile(user_id)).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/v1/user/profile
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::body(payload)?;
    let user_id = identity.user_id();
    let user = blocking(move || services.accounts.update_profile(user_id, &req.first_name, &req.last_name)).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/v1/user/change-password
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::body(payload)?;
    let user_id = identity.user_id();
    blocking(move || {
        services
            .accounts
            .change_password(user_id, &req.current_password, &req.new_password)
    })
    .await?;
    Ok(Json(MessageResponse::new("password changed successfully")))
}
