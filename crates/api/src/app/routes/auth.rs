use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::app::session::Session;
use crate::app::{cookies, dto, errors, services::AppServices};
use crate::middleware::CurrentPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/sso", post(sso))
        .route("/logout", post(logout))
}

/// POST /api/auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.session.login(&body.email, &body.password).await {
        Ok(session) => session_response(&services, session),
        Err(e) => errors::session_error_to_response(e),
    }
}

/// GET /api/auth/me - current session, re-read from the directory
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> axum::response::Response {
    match services.session.current(principal.user_id()).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => errors::session_error_to_response(e),
    }
}

/// POST /api/auth/sso - exchange an external identity token
pub async fn sso(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SsoRequest>,
) -> axum::response::Response {
    match services.session.exchange_external(&body.keycloak_token).await {
        Ok(session) => session_response(&services, session),
        Err(e) => errors::session_error_to_response(e),
    }
}

/// POST /api/auth/logout - always succeeds
pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let cookie = cookies::cleared_cookie(&services.cookie.name, services.cookie.secure);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

fn session_response(services: &AppServices, session: Session) -> axum::response::Response {
    let cookie = cookies::session_cookie(
        &services.cookie.name,
        &session.response.token,
        session.expires_at,
        services.cookie.secure,
    );
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(session.response)).into_response()
}
