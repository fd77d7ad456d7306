use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;

use tenantry_core::TenantId;
use tenantry_infra::{NewTenant, StoreError};

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;
use crate::middleware::CurrentPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tenants).post(create_tenant))
        .route("/:id", get(get_tenant).put(update_tenant).delete(delete_tenant))
}

pub(crate) fn parse_tenant_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    raw.parse::<TenantId>()
        .map_err(|_| errors::bad_request("tenant id must be a UUID"))
}

/// GET /api/tenants - active tenants with member counts
pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(_principal): CurrentPrincipal,
) -> axum::response::Response {
    match services.directory.list_active_tenants().await {
        Ok(tenants) => {
            let items = tenants.iter().map(dto::tenant_summary_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}

/// GET /api/tenants/:id - tenant with its active members
pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(_principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let tenant = match services.directory.find_tenant(id).await {
        Ok(Some(t)) => t,
        Ok(None) => return errors::store_error_to_response(StoreError::NotFound, "tenant"),
        Err(e) => return errors::store_error_to_response(e, "tenant"),
    };

    match services.directory.tenant_members(id).await {
        Ok(members) => {
            let mut body = dto::tenant_to_json(&tenant);
            body["users"] = members.iter().map(dto::tenant_member_to_json).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}

/// POST /api/tenants (global admin)
pub async fn create_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<dto::CreateTenantRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }

    let name = body.name.trim();
    let code = body.code.trim();
    if name.is_empty() || code.is_empty() {
        return errors::bad_request("name and code are required");
    }

    let created = services
        .directory
        .create_tenant(NewTenant {
            name: name.to_string(),
            code: code.to_string(),
            description: body.description.filter(|d| !d.trim().is_empty()),
        })
        .await;

    match created {
        Ok(tenant) => {
            info!(tenant = %tenant.code, "tenant created");
            (StatusCode::CREATED, Json(dto::tenant_to_json(&tenant))).into_response()
        }
        Err(StoreError::Conflict(_)) => errors::bad_request("Tenant code already exists"),
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}

/// PUT /api/tenants/:id (global admin)
pub async fn update_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateTenantRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }
    let id = match parse_tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if body.name.trim().is_empty() {
        return errors::bad_request("name is required");
    }

    match services
        .directory
        .update_tenant(id, body.name.trim(), body.description.as_deref())
        .await
    {
        Ok(tenant) => (StatusCode::OK, Json(dto::tenant_to_json(&tenant))).into_response(),
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}

/// DELETE /api/tenants/:id (global admin, soft)
pub async fn delete_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(principal.as_deref(), &services.global_admin_policy) {
        return resp;
    }
    let id = match parse_tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.directory.deactivate_tenant(id).await {
        Ok(()) => {
            info!(tenant_id = %id, "tenant deactivated");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e, "tenant"),
    }
}
