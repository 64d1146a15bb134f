//! Auth gate: bearer-token authentication in strict and permissive modes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use gatehouse_auth::{TokenKind, TokenManager};
use gatehouse_core::AppError;

use crate::app::errors::ApiError;
use crate::context::{IdentityContext, MaybeIdentity};

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenManager>,
}

/// Strict mode: any failure ends the request with 401 before the handler runs.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()) {
        Ok(identity) => {
            tracing::debug!(user_id = %identity.user_id(), "request authenticated");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "request rejected by auth gate");
            ApiError::from(e).into_response()
        }
    }
}

/// Permissive mode: failures fall through as unauthenticated.
pub async fn optional_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let identity = match authenticate(&state, req.headers()) {
        Ok(identity) => Some(identity),
        Err(e) => {
            if req.headers().contains_key(axum::http::header::AUTHORIZATION) {
                tracing::debug!(error = %e, "ignoring unusable credentials on optional route");
            }
            None
        }
    };

    req.extensions_mut().insert(MaybeIdentity(identity));
    next.run(req).await
}

fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<IdentityContext, AppError> {
    let token = extract_bearer(headers)?;
    let claims = state.tokens.validate(token)?;

    if claims.kind != TokenKind::Access {
        return Err(AppError::unauthorized("invalid token type"));
    }

    Ok(IdentityContext::from(&claims))
}

/// Accepts exactly `Bearer <token>`.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("authorization header required"))?;

    let header = header
        .to_str()
        .map_err(|_| AppError::unauthorized("invalid authorization header format"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("invalid authorization header format"))?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AppError::unauthorized("invalid authorization header format"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        let h = headers("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn malformed_authorization_values_are_rejected() {
        for value in ["abc.def.ghi", "bearer abc", "Bearer ", "Bearer  abc", "Bearer a b", "Basic dXNlcjpwdw=="] {
            assert!(
                matches!(extract_bearer(&headers(value)), Err(AppError::Unauthorized(_))),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_header_is_unauthorized() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Err(AppError::Unauthorized(_))));
    }
}
