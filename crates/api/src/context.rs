use tenantry_auth::SessionClaims;
use tenantry_core::UserId;

/// Principal context for a request (verified session claims).
///
/// Inserted by the session middleware only after signature, issuer,
/// audience and expiry checks pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    claims: SessionClaims,
}

impl PrincipalContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn user_id(&self) -> &UserId {
        self.claims.user_id()
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
