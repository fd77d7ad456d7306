use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Role label used for global and tenant-scoped grants.
///
/// Labels are opaque strings at this layer; which labels mean what is decided
/// by the application's [`RoleCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Role {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Role {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Which of the two application deployments this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppProfile {
    #[default]
    Compliance,
    Tdh,
}

impl AppProfile {
    pub fn catalog(self) -> RoleCatalog {
        match self {
            AppProfile::Compliance => RoleCatalog::compliance(),
            AppProfile::Tdh => RoleCatalog::tdh(),
        }
    }

    /// Display name, also the default token issuer/audience.
    pub fn display_name(self) -> &'static str {
        match self {
            AppProfile::Compliance => "Compliance",
            AppProfile::Tdh => "TDH",
        }
    }

    /// Application code used by the external profile directory.
    pub fn app_code(self) -> &'static str {
        self.display_name()
    }
}

impl core::str::FromStr for AppProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compliance" => Ok(AppProfile::Compliance),
            "tdh" => Ok(AppProfile::Tdh),
            other => Err(format!("unknown application profile '{other}'")),
        }
    }
}

/// The closed set of role labels one application understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    /// Application-wide administrator.
    pub global_admin: Role,
    /// Tenant-scoped administrator; also granted globally on promotion.
    pub tenant_admin: Role,
    /// Default role for tenant members.
    pub member: Role,
    /// Name of the composite admin policy.
    pub policy_name: &'static str,
}

impl RoleCatalog {
    pub fn compliance() -> Self {
        Self {
            global_admin: Role::from_static("AppAdmin"),
            tenant_admin: Role::from_static("GroupAdmin"),
            member: Role::from_static("User"),
            policy_name: "AppAdminOrGroupAdmin",
        }
    }

    pub fn tdh() -> Self {
        Self {
            global_admin: Role::from_static("Admin"),
            tenant_admin: Role::from_static("EntityAdmin"),
            member: Role::from_static("User"),
            policy_name: "AdminOrEntityAdmin",
        }
    }

    /// Labels accepted for a user-tenant assignment.
    pub fn is_assignable(&self, role: &str) -> bool {
        self.all().iter().any(|r| r.as_str() == role)
    }

    pub fn all(&self) -> [&Role; 3] {
        [&self.global_admin, &self.tenant_admin, &self.member]
    }
}

/// Order-preserving de-duplication of role labels.
pub fn dedup_roles<I>(roles: I) -> Vec<Role>
where
    I: IntoIterator<Item = Role>,
{
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}
