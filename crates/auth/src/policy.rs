//! Named authorization policies evaluated over verified session claims.
//!
//! Policies are pure predicates: no I/O, no lookups. A policy either succeeds
//! or stays unresolved; the caller treats "unresolved" as a denial.

use serde::Serialize;

use crate::grants::split_tenant_role;
use crate::{Role, RoleCatalog, SessionClaims};

/// Why a policy succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grounds {
    GlobalRole { role: String },
    TenantRole { tenant: String, role: String },
}

impl core::fmt::Display for Grounds {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Grounds::GlobalRole { role } => write!(f, "global role {role}"),
            Grounds::TenantRole { tenant, role } => write!(f, "role {role} in tenant {tenant}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    Succeeded(Grounds),
    Unresolved,
}

/// A named check over the caller's claims.
pub trait AuthorizationPolicy: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, claims: &SessionClaims) -> PolicyOutcome;
}

/// Succeeds for the global admin, the global tenant admin, or anyone holding
/// the tenant-admin role in at least one tenant.
///
/// This is a coarse "administers something" gate; it does not look at which
/// tenant the request targets.
#[derive(Debug, Clone)]
pub struct TenantAdminOrAppAdmin {
    name: String,
    global_admin: Role,
    global_tenant_admin: Role,
    tenant_admin: Role,
}

impl TenantAdminOrAppAdmin {
    pub fn new(name: impl Into<String>, global_admin: Role, global_tenant_admin: Role, tenant_admin: Role) -> Self {
        Self {
            name: name.into(),
            global_admin,
            global_tenant_admin,
            tenant_admin,
        }
    }

    pub fn from_catalog(catalog: &RoleCatalog) -> Self {
        Self::new(
            catalog.policy_name,
            catalog.global_admin.clone(),
            catalog.tenant_admin.clone(),
            catalog.tenant_admin.clone(),
        )
    }
}

impl AuthorizationPolicy for TenantAdminOrAppAdmin {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, claims: &SessionClaims) -> PolicyOutcome {
        for global in [&self.global_admin, &self.global_tenant_admin] {
            if claims.has_role(global.as_str()) {
                return PolicyOutcome::Succeeded(Grounds::GlobalRole {
                    role: global.to_string(),
                });
            }
        }

        let tenant_admin = self.tenant_admin.as_str();
        claims
            .tenant_role_claims()
            .filter_map(split_tenant_role)
            .find(|(_, role)| *role == tenant_admin)
            .map(|(tenant, role)| {
                PolicyOutcome::Succeeded(Grounds::TenantRole {
                    tenant: tenant.to_string(),
                    role: role.to_string(),
                })
            })
            .unwrap_or(PolicyOutcome::Unresolved)
    }
}

/// Succeeds only for callers holding one specific global role.
#[derive(Debug, Clone)]
pub struct RequireRole {
    name: String,
    role: Role,
}

impl RequireRole {
    pub fn new(role: Role) -> Self {
        Self {
            name: format!("role:{role}"),
            role,
        }
    }
}

impl AuthorizationPolicy for RequireRole {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, claims: &SessionClaims) -> PolicyOutcome {
        if claims.has_role(self.role.as_str()) {
            PolicyOutcome::Succeeded(Grounds::GlobalRole {
                role: self.role.to_string(),
            })
        } else {
            PolicyOutcome::Unresolved
        }
    }
}
