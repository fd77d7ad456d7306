use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use tenantry_auth::{dedup_roles, hash_password, Role};
use tenantry_core::UserId;
use tenantry_infra::{NewUser, StoreError};

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;
use crate::middleware::CurrentPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(|_| errors::bad_request("user id is required"))
}

/// GET /api/users (composite admin policy)
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.admin_policy) {
        return resp;
    }

    let users = match services.directory.list_active_users().await {
        Ok(users) => users,
        Err(e) => return errors::store_error_to_response(e, "user"),
    };

    let mut items = Vec::with_capacity(users.len());
    for user in &users {
        match services.directory.global_roles(&user.id).await {
            Ok(roles) => items.push(dto::user_to_json(user, &roles)),
            Err(e) => return errors::store_error_to_response(e, "user"),
        }
    }
    (StatusCode::OK, Json(items)).into_response()
}

/// GET /api/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(_principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let user = match services.directory.find_user(&id).await {
        Ok(Some(user)) => user,
        Ok(None) => return errors::store_error_to_response(StoreError::NotFound, "user"),
        Err(e) => return errors::store_error_to_response(e, "user"),
    };
    match services.directory.global_roles(&id).await {
        Ok(roles) => (StatusCode::OK, Json(dto::user_to_json(&user, &roles))).into_response(),
        Err(e) => errors::store_error_to_response(e, "user"),
    }
}

/// POST /api/users (composite admin policy)
///
/// Only a global admin may hand out the global admin role.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    let principal = principal.as_deref();
    if let Err(resp) = authz::require(principal, &services.admin_policy) {
        return resp;
    }

    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return errors::bad_request("a valid email is required");
    }
    if body.password.is_empty() {
        return errors::bad_request("password is required");
    }

    let mut roles = Vec::with_capacity(body.roles.len());
    for raw in &body.roles {
        let raw = raw.trim();
        if !services.catalog.is_assignable(raw) {
            return errors::bad_request(format!("Invalid role '{raw}'"));
        }
        roles.push(Role::new(raw.to_string()));
    }
    let roles = dedup_roles(roles);

    let granting_admin = roles.contains(&services.catalog.global_admin);
    let caller_is_admin = principal.is_some_and(|p| p.claims().has_role(services.catalog.global_admin.as_str()));
    if granting_admin && !caller_is_admin {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("only {} may grant {}", services.catalog.global_admin, services.catalog.global_admin),
        );
    }

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "password hashing failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error");
        }
    };

    let created = services
        .directory
        .create_user(NewUser {
            email: email.to_string(),
            first_name: body.first_name.trim().to_string(),
            last_name: body.last_name.trim().to_string(),
            email_confirmed: true,
            password_hash: Some(password_hash),
        })
        .await;

    let user = match created {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => return errors::bad_request("Email already registered"),
        Err(e) => return errors::store_error_to_response(e, "user"),
    };

    for role in &roles {
        if let Err(e) = services.directory.add_global_role(&user.id, role).await {
            return errors::store_error_to_response(e, "user");
        }
    }

    info!(user_id = %user.id, "user created");
    (StatusCode::CREATED, Json(dto::user_to_json(&user, &roles))).into_response()
}

/// PUT /api/users/:id (composite admin policy)
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.admin_policy) {
        return resp;
    }
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let password_hash = match body.password.as_deref().filter(|p| !p.is_empty()).map(hash_password) {
        None => None,
        Some(Ok(hash)) => Some(hash),
        Some(Err(e)) => {
            error!(error = %e, "password hashing failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error");
        }
    };

    let user = match services
        .directory
        .update_user_profile(&id, body.first_name.trim(), body.last_name.trim())
        .await
    {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e, "user"),
    };
    if let Some(hash) = password_hash {
        if let Err(e) = services.directory.set_password_hash(&id, hash).await {
            return errors::store_error_to_response(e, "user");
        }
        info!(user_id = %id, "password reset");
    }
    match services.directory.global_roles(&id).await {
        Ok(roles) => (StatusCode::OK, Json(dto::user_to_json(&user, &roles))).into_response(),
        Err(e) => errors::store_error_to_response(e, "user"),
    }
}

/// DELETE /api/users/:id (global admin, soft)
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.directory.deactivate_user(&id).await {
        Ok(()) => {
            info!(user_id = %id, "user deactivated");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e, "user"),
    }
}
