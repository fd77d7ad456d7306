//! Session token issuance and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{validate_claims, SessionClaims, TokenValidationError};
use crate::{Role, TenantRoleGrant, VerifiedIdentity};

/// Lifetime of every session token.
pub const SESSION_LIFETIME_HOURS: i64 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token signing key configured")]
    MissingSigningKey,

    #[error("token encoding failed: {0}")]
    Encode(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,
}

impl From<TokenValidationError> for TokenError {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => TokenError::Expired,
            TokenValidationError::NotYetValid => TokenError::NotYetValid,
            TokenValidationError::InvalidTimeWindow => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Signing material and fixed claim values for one application instance.
#[derive(Clone)]
pub struct TokenSettings {
    pub signing_key: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    pub lifetime: Duration,
}

impl TokenSettings {
    pub fn new(signing_key: impl Into<Vec<u8>>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime: Duration::hours(SESSION_LIFETIME_HOURS),
        }
    }
}

impl core::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// A freshly minted session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints signed session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    settings: TokenSettings,
}

impl TokenIssuer {
    /// Fails when no signing key is configured; callers treat this as a
    /// startup error.
    pub fn new(settings: TokenSettings) -> Result<Self, TokenError> {
        if settings.signing_key.is_empty() {
            return Err(TokenError::MissingSigningKey);
        }
        Ok(Self {
            key: EncodingKey::from_secret(&settings.signing_key),
            settings,
        })
    }

    /// Verifier matching this issuer's key, issuer and audience.
    pub fn validator(&self) -> Hs256TokenValidator {
        Hs256TokenValidator::new(&self.settings)
    }

    pub fn issue(
        &self,
        identity: &VerifiedIdentity,
        roles: &[Role],
        grants: &[TenantRoleGrant],
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, roles, grants, Utc::now())
    }

    /// Mint a token as of `now`; valid for exactly the configured lifetime.
    pub fn issue_at(
        &self,
        identity: &VerifiedIdentity,
        roles: &[Role],
        grants: &[TenantRoleGrant],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.settings.lifetime;
        let claims = SessionClaims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            roles: roles.to_vec(),
            tenant_roles: grants.iter().map(TenantRoleGrant::to_claim).collect(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7().to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Encode(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }
}

/// Verifies session tokens and yields their claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// HS256 validator: signature, issuer, audience, then the time window.
#[derive(Clone)]
pub struct Hs256TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenValidator {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["sub", "iss", "aud", "exp"]);
        // Expiry is checked against the caller's clock in `validate_claims`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(&settings.signing_key),
            validation,
        }
    }
}

impl TokenValidator for Hs256TokenValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&claims, now)?;
        Ok(claims)
    }
}
