//! `tenantry-auth`: pure authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: token minting and verification, the
//! composite tenant-admin policy, and the login-time role reconciliation rule.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod federation;
pub mod grants;
pub mod password;
pub mod policy;
pub mod principal;
pub mod reconcile;
pub mod roles;
pub mod token;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, SessionClaims, TokenValidationError};
pub use error::AuthError;
pub use federation::{ExternalIdentity, FederationError};
pub use grants::{split_tenant_role, GrantError, TenantRoleGrant};
pub use password::{hash_password, verify_password};
pub use policy::{AuthorizationPolicy, Grounds, PolicyOutcome, RequireRole, TenantAdminOrAppAdmin};
pub use principal::{display_name, VerifiedIdentity};
pub use reconcile::{reconcile_global_roles, Reconciliation};
pub use roles::{dedup_roles, AppProfile, Role, RoleCatalog};
pub use token::{
    Hs256TokenValidator, IssuedToken, TokenError, TokenIssuer, TokenSettings, TokenValidator, SESSION_LIFETIME_HOURS,
};
