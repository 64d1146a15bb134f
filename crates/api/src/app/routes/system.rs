use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

use gatehouse_core::AppError;

use crate::app::errors::ApiError;
use crate::app::services::{AppServices, blocking};
use crate::context::MaybeIdentity;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /api/v1/whoami (permissive gate)
///
/// A valid token only counts while its user exists and is active.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<MaybeIdentity>,
) -> Result<Json<Value>, ApiError> {
    let anonymous = || Json(json!({ "authenticated": false }));

    let Some(identity) = identity.0 else {
        return Ok(anonymous());
    };

    let user_id = identity.user_id();
    match blocking(move || services.accounts.get_profile(user_id)).await {
        Ok(user) => Ok(Json(json!({
            "authenticated": true,
            "user_id": user.id.to_string(),
            "email": user.email,
        }))),
        Err(AppError::NotFound(_) | AppError::Unauthorized(_)) => {
            tracing::debug!(%user_id, "token holder is missing or deactivated");
            Ok(anonymous())
        }
        Err(e) => Err(e.into()),
    }
}
