//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service wiring (directory, token manager, flows, resolver)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
    };

    let api = Router::new()
        .nest("/auth", routes::auth::router(auth_state.clone()))
        .nest("/user", routes::users::router(auth_state.clone()))
        .nest("/admin", routes::admin::router(auth_state.clone(), services.resolver.clone()))
        .route(
            "/whoami",
            get(routes::system::whoami).layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::optional_auth,
            )),
        );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}
