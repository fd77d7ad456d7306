use serde::Deserialize;
use serde_json::json;

use tenantry_auth::Role;
use tenantry_infra::{Membership, TenantMember, TenantRecord, TenantSummary, UserRecord};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoRequest {
    pub keycloak_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub tenant_id: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignRoleRequest {
    pub user_id: String,
    pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Global roles to grant.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    /// Replaces the stored password when present and non-empty.
    #[serde(default)]
    pub password: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn tenant_to_json(t: &TenantRecord) -> serde_json::Value {
    json!({
        "id": t.id,
        "name": t.name,
        "code": t.code,
        "description": t.description,
        "isActive": t.is_active,
        "createdAt": t.created_at,
        "modifiedAt": t.modified_at,
    })
}

pub fn tenant_summary_to_json(s: &TenantSummary) -> serde_json::Value {
    let mut value = tenant_to_json(&s.tenant);
    value["userCount"] = json!(s.user_count);
    value
}

pub fn tenant_member_to_json(m: &TenantMember) -> serde_json::Value {
    json!({
        "userId": m.user.id,
        "email": m.user.email,
        "fullName": m.user.display_name(),
        "role": m.role,
        "assignedAt": m.assigned_at,
    })
}

pub fn membership_to_json(m: &Membership) -> serde_json::Value {
    json!({
        "tenantId": m.tenant.id,
        "tenantName": m.tenant.name,
        "tenantCode": m.tenant.code,
        "role": m.role,
        "assignedAt": m.assigned_at,
    })
}

pub fn user_to_json(u: &UserRecord, roles: &[Role]) -> serde_json::Value {
    json!({
        "id": u.id,
        "email": u.email,
        "firstName": u.first_name,
        "lastName": u.last_name,
        "fullName": u.display_name(),
        "isActive": u.is_active,
        "emailConfirmed": u.email_confirmed,
        "createdAt": u.created_at,
        "roles": roles,
    })
}
