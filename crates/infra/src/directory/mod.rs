//! Directory of users, tenants, global roles and user-tenant assignments.
//!
//! The directory is the system of record for identities. Nothing is ever
//! physically deleted: users, tenants and assignments are soft-deactivated.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use tenantry_auth::{display_name, Role, TenantRoleGrant};
use tenantry_core::{TenantId, UserId};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryDirectory;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDirectory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was hit (email, tenant code).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("directory backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub email_confirmed: bool,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

/// An active tenant with its count of active members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSummary {
    pub tenant: TenantRecord,
    pub user_count: usize,
}

/// One active assignment of a user, joined with its tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub tenant: TenantRecord,
    pub role: Role,
    pub assigned_at: DateTime<Utc>,
}

impl Membership {
    /// Structured grant for token issuance; `None` if the stored label cannot
    /// be encoded.
    pub fn grant(&self) -> Option<TenantRoleGrant> {
        TenantRoleGrant::new(self.tenant.id, self.role.clone()).ok()
    }
}

/// One active member of a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantMember {
    pub user: UserRecord,
    pub role: Role,
    pub assigned_at: DateTime<Utc>,
}

/// What an assignment did to the (user, tenant) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Created,
    /// Active row; role overwritten.
    Updated,
    /// Inactive row switched back on with a fresh assignment timestamp.
    Reactivated,
}

/// Identity and tenant directory.
///
/// Implementations enforce email and tenant-code uniqueness themselves;
/// callers rely on `StoreError::Conflict` rather than check-then-insert.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // users
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord>;
    async fn list_active_users(&self) -> StoreResult<Vec<UserRecord>>;
    async fn has_users(&self) -> StoreResult<bool>;
    /// Fails with `NotFound` for missing or inactive users.
    async fn update_user_profile(&self, id: &UserId, first_name: &str, last_name: &str) -> StoreResult<UserRecord>;
    async fn set_password_hash(&self, id: &UserId, hash: String) -> StoreResult<()>;
    async fn deactivate_user(&self, id: &UserId) -> StoreResult<()>;

    // global roles
    async fn global_roles(&self, id: &UserId) -> StoreResult<Vec<Role>>;
    /// Idempotent; returns whether the role was newly added.
    async fn add_global_role(&self, id: &UserId, role: &Role) -> StoreResult<bool>;

    // tenants
    async fn create_tenant(&self, new: NewTenant) -> StoreResult<TenantRecord>;
    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<TenantRecord>>;
    async fn find_tenant_by_code(&self, code: &str) -> StoreResult<Option<TenantRecord>>;
    async fn list_active_tenants(&self) -> StoreResult<Vec<TenantSummary>>;
    /// Fails with `NotFound` for missing or inactive tenants.
    async fn update_tenant(&self, id: TenantId, name: &str, description: Option<&str>) -> StoreResult<TenantRecord>;
    async fn deactivate_tenant(&self, id: TenantId) -> StoreResult<()>;

    // assignments
    async fn assign_tenant_role(&self, user: &UserId, tenant: TenantId, role: &Role) -> StoreResult<AssignmentOutcome>;
    /// Soft delete; `NotFound` if the pair was never assigned.
    async fn unassign_tenant_role(&self, user: &UserId, tenant: TenantId) -> StoreResult<()>;
    async fn active_memberships(&self, user: &UserId) -> StoreResult<Vec<Membership>>;
    async fn tenant_members(&self, tenant: TenantId) -> StoreResult<Vec<TenantMember>>;
}

/// Shared handle used by the HTTP layer.
pub type SharedDirectory = Arc<dyn DirectoryStore>;

/// Case-insensitive key for email uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
