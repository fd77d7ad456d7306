use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use tenantry_auth::Role;
use tenantry_core::UserId;

use crate::app::routes::tenants::parse_tenant_id;
use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;
use crate::middleware::CurrentPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/assign", post(assign))
        .route("/unassign", post(unassign))
        .route("/user/:user_id", get(user_tenants))
        .route("/tenant/:tenant_id", get(tenant_users))
}

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(|_| errors::bad_request("user id is required"))
}

/// POST /api/usertenants/assign (global admin)
///
/// Upserts the (user, tenant) role. Assigning the tenant-admin role also
/// grants it globally.
pub async fn assign(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<dto::AssignRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }

    let role = body.role.trim();
    if !services.catalog.is_assignable(role) {
        let allowed = services.catalog.all().into_iter().map(Role::as_str).collect::<Vec<_>>().join(", ");
        return errors::bad_request(format!("Invalid role. Must be one of: {allowed}"));
    }
    let role = Role::new(role.to_string());

    let user_id = match parse_user_id(&body.user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let tenant_id = match parse_tenant_id(&body.tenant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let outcome = match services.directory.assign_tenant_role(&user_id, tenant_id, &role).await {
        Ok(outcome) => outcome,
        Err(e) => return errors::store_error_to_response(e, "user or tenant"),
    };
    info!(%user_id, %tenant_id, %role, ?outcome, "tenant role assigned");

    if role == services.catalog.tenant_admin {
        match services.directory.add_global_role(&user_id, &role).await {
            Ok(true) => info!(%user_id, %role, "promoted global role on assignment"),
            Ok(false) => {}
            Err(e) => return errors::store_error_to_response(e, "user"),
        }
    }

    (
        StatusCode::OK,
        Json(json!({ "message": "Role assigned successfully", "outcome": outcome })),
    )
        .into_response()
}

/// POST /api/usertenants/unassign (global admin, soft)
pub async fn unassign(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<dto::UnassignRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }
    let user_id = match parse_user_id(&body.user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let tenant_id = match parse_tenant_id(&body.tenant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.directory.unassign_tenant_role(&user_id, tenant_id).await {
        Ok(()) => {
            info!(%user_id, %tenant_id, "tenant role unassigned");
            (StatusCode::OK, Json(json!({ "message": "User unassigned from tenant successfully" }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "assignment"),
    }
}

/// GET /api/usertenants/user/:user_id
pub async fn user_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(_principal): CurrentPrincipal,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.directory.active_memberships(&user_id).await {
        Ok(memberships) => {
            let items = memberships.iter().map(dto::membership_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "user"),
    }
}

/// GET /api/usertenants/tenant/:tenant_id
pub async fn tenant_users(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(_principal): CurrentPrincipal,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.directory.tenant_members(tenant_id).await {
        Ok(members) => {
            let items = members.iter().map(dto::tenant_member_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}
