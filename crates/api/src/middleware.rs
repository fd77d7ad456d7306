use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use tenantry_auth::TokenValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct SessionState {
    pub validator: Arc<dyn TokenValidator>,
    pub cookie_name: Arc<str>,
}

/// Attach the caller's verified claims, if any.
///
/// Never rejects: routes decide whether they need a principal. Invalid or
/// expired tokens simply leave the request unauthenticated.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = resolve_token(req.headers(), &state.cookie_name) {
        match state.validator.validate(&token, Utc::now()) {
            Ok(claims) => {
                req.extensions_mut().insert(PrincipalContext::new(claims));
            }
            Err(e) => debug!(error = %e, "ignoring unusable session token"),
        }
    }

    next.run(req).await
}

/// Session cookie first, then `Authorization: Bearer`.
pub fn resolve_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Extractor for routes that only need an authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub PrincipalContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized").into_response())
    }
}
