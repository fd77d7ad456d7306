use thiserror::Error;

use crate::{AuthorizationPolicy, Grounds, PolicyOutcome, SessionClaims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: policy '{0}' not satisfied")]
    Forbidden(String),
}

/// Authorize a caller against a policy.
///
/// - No IO
/// - No panics
/// - `None` claims (no verified token on the request) is `Unauthenticated`
pub fn authorize(
    claims: Option<&SessionClaims>,
    policy: &dyn AuthorizationPolicy,
) -> Result<Grounds, AuthzError> {
    let claims = claims.ok_or(AuthzError::Unauthenticated)?;

    match policy.evaluate(claims) {
        PolicyOutcome::Succeeded(grounds) => Ok(grounds),
        PolicyOutcome::Unresolved => Err(AuthzError::Forbidden(policy.name().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequireRole, Role};

    fn claims(roles: &[&str]) -> SessionClaims {
        SessionClaims {
            sub: "u".parse().unwrap(),
            email: "u@x.com".into(),
            name: "U".into(),
            roles: roles.iter().map(|r| Role::new(r.to_string())).collect(),
            tenant_roles: vec![],
            iss: "i".into(),
            aud: "a".into(),
            iat: 0,
            exp: 1,
            jti: "j".into(),
        }
    }

    #[test]
    fn missing_claims_are_unauthenticated() {
        let policy = RequireRole::new(Role::new("AppAdmin"));
        assert_eq!(authorize(None, &policy), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn unresolved_policy_is_forbidden() {
        let policy = RequireRole::new(Role::new("AppAdmin"));
        let c = claims(&["User"]);
        assert_eq!(
            authorize(Some(&c), &policy),
            Err(AuthzError::Forbidden("role:AppAdmin".into()))
        );
    }

    #[test]
    fn success_returns_grounds() {
        let policy = RequireRole::new(Role::new("AppAdmin"));
        let c = claims(&["AppAdmin"]);
        assert_eq!(
            authorize(Some(&c), &policy),
            Ok(Grounds::GlobalRole { role: "AppAdmin".into() })
        );
    }
}
