use axum::Router;

pub mod auth;
pub mod system;
pub mod tenants;
pub mod user_tenants;
pub mod users;

/// Router for everything under `/api`.
///
/// Routes read the caller from the session middleware and apply their own
/// policy; nothing here rejects before the handler runs.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/tenants", tenants::router())
        .nest("/usertenants", user_tenants::router())
        .nest("/users", users::router())
}
