//! Reading identity claims out of an externally issued token.
//!
//! The external identity provider is trusted to have authenticated the
//! caller; this module only checks that the token is a well-formed JWT and
//! pulls out the identity fields. It does not verify the provider's
//! signature.

use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FederationError {
    #[error("external token is malformed: {0}")]
    Malformed(String),

    #[error("external token carries no email")]
    MissingEmail,
}

#[derive(Debug, Deserialize)]
struct ExternalClaims {
    sub: Option<String>,
    email: Option<String>,
    preferred_username: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

/// Identity fields read from an external token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    /// Subject id at the external provider.
    pub subject: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl ExternalIdentity {
    /// Parse an external token; fails closed on anything unreadable.
    pub fn parse(token: &str) -> Result<Self, FederationError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = jsonwebtoken::decode::<ExternalClaims>(
            token.trim(),
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .map_err(|e| FederationError::Malformed(e.to_string()))?
        .claims;

        let email = [claims.email, claims.preferred_username]
            .into_iter()
            .flatten()
            .map(|e| e.trim().to_string())
            .find(|e| !e.is_empty())
            .ok_or(FederationError::MissingEmail)?;

        Ok(Self {
            email,
            subject: non_empty(claims.sub),
            given_name: non_empty(claims.given_name),
            family_name: non_empty(claims.family_name),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
