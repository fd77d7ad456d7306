//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: directory, token issuer and policies shared by handlers
//! - `session.rs`: login / session / federated sign-in
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod cookies;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod session;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let session_state = middleware::SessionState {
        validator: services.validator.clone(),
        cookie_name: Arc::from(services.cookie.name.as_str()),
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(axum::middleware::from_fn_with_state(
                    session_state,
                    middleware::session_middleware,
                )),
        )
}
