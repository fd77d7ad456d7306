use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantry_core::UserId;

use crate::{Role, TenantRoleGrant};

/// Claims carried by a session token.
///
/// A snapshot taken at issuance: role changes made afterwards are not visible
/// until a new token is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the identity-store user id.
    pub sub: UserId,

    pub email: String,

    /// Display name (`"{first} {last}"`).
    pub name: String,

    /// Global roles, one entry per role.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Tenant-scoped roles in their wire form, `"{tenantId}:{role}"`.
    ///
    /// Kept raw so a malformed entry is skipped by readers instead of failing
    /// the whole token.
    #[serde(default)]
    pub tenant_roles: Vec<String>,

    pub iss: String,
    pub aud: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiration (unix seconds).
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> &UserId {
        &self.sub
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn tenant_role_claims(&self) -> impl Iterator<Item = &str> {
        self.tenant_roles.iter().map(String::as_str)
    }

    /// Structured tenant grants; malformed claim values are dropped.
    pub fn tenant_grants(&self) -> Vec<TenantRoleGrant> {
        self.tenant_roles
            .iter()
            .filter_map(|raw| TenantRoleGrant::from_claim(raw))
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of a session token.
///
/// Signature, issuer and audience are checked by the token validator before
/// this runs.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
