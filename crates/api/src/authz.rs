//! Route-level authorization guard.
//!
//! Handlers call [`require`] before touching the directory; authentication
//! and policy failures map to 401 and 403 respectively.

use axum::{http::StatusCode, response::Response};
use tracing::{debug, info};

use tenantry_auth::{authorize, AuthorizationPolicy, AuthzError, Grounds};

use crate::app::errors;
use crate::context::PrincipalContext;

pub fn require(principal: Option<&PrincipalContext>, policy: &dyn AuthorizationPolicy) -> Result<Grounds, Response> {
    match authorize(principal.map(PrincipalContext::claims), policy) {
        Ok(grounds) => {
            debug!(policy = policy.name(), %grounds, "policy satisfied");
            Ok(grounds)
        }
        Err(AuthzError::Unauthenticated) => Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "unauthorized",
        )),
        Err(e @ AuthzError::Forbidden(_)) => {
            info!(
                policy = policy.name(),
                user_id = principal.map(|p| p.user_id().as_str()).unwrap_or_default(),
                "policy denied"
            );
            Err(errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
        }
    }
}
