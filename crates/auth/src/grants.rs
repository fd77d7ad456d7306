//! Tenant-scoped role grants and their claim encoding.
//!
//! A grant is a structured `(tenant, role)` pair everywhere in the codebase.
//! The `"{tenantId}:{role}"` string only exists on the wire, inside a
//! session token.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantry_core::TenantId;

use crate::Role;

/// Separator between tenant id and role in the claim encoding.
pub const TENANT_ROLE_SEPARATOR: char = ':';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    #[error("role label must not be empty")]
    EmptyRole,

    #[error("role label '{0}' contains the claim separator")]
    SeparatorInRole(String),
}

/// A role held within one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantRoleGrant {
    pub tenant_id: TenantId,
    pub role: Role,
}

impl TenantRoleGrant {
    pub fn new(tenant_id: TenantId, role: Role) -> Result<Self, GrantError> {
        if role.as_str().is_empty() {
            return Err(GrantError::EmptyRole);
        }
        if role.as_str().contains(TENANT_ROLE_SEPARATOR) {
            return Err(GrantError::SeparatorInRole(role.as_str().to_string()));
        }
        Ok(Self { tenant_id, role })
    }

    /// Wire encoding used inside session tokens.
    pub fn to_claim(&self) -> String {
        format!("{}{}{}", self.tenant_id, TENANT_ROLE_SEPARATOR, self.role)
    }

    /// Decode a claim value; malformed values yield `None`.
    pub fn from_claim(raw: &str) -> Option<Self> {
        let (tenant, role) = split_tenant_role(raw)?;
        let tenant_id = tenant.parse::<TenantId>().ok()?;
        Self::new(tenant_id, Role::new(role.to_string())).ok()
    }
}

/// Split a raw tenant-role claim into its tenant and role parts.
///
/// Returns `None` unless the value splits into exactly two parts, so a value
/// with no separator or with more than one separator is ignored.
pub fn split_tenant_role(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split(TENANT_ROLE_SEPARATOR);
    let tenant = parts.next()?;
    let role = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((tenant, role))
}
