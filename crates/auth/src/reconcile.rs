//! Login-time reconciliation of global roles against tenant grants.
//!
//! Holding the tenant-admin role in any tenant grants the same label
//! globally. The rule only ever adds a role, and adding one that is already
//! present changes nothing, so concurrent sessions may apply it freely.

use crate::{dedup_roles, Role, RoleCatalog, TenantRoleGrant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Global roles to put in the token (de-duplicated, original order).
    pub roles: Vec<Role>,

    /// Role the caller must persist on the identity record, if any.
    pub promoted: Option<Role>,
}

pub fn reconcile_global_roles(
    current: &[Role],
    grants: &[TenantRoleGrant],
    catalog: &RoleCatalog,
) -> Reconciliation {
    let mut roles = dedup_roles(current.iter().cloned());

    let holds_tenant_admin = grants.iter().any(|g| g.role == catalog.tenant_admin);
    let promoted = if holds_tenant_admin && !roles.contains(&catalog.tenant_admin) {
        roles.push(catalog.tenant_admin.clone());
        Some(catalog.tenant_admin.clone())
    } else {
        None
    };

    Reconciliation { roles, promoted }
}
