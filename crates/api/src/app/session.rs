//! Session lifecycle: password login, session introspection and the
//! federated sign-in exchange.
//!
//! All three paths resolve the caller's global roles the same way: read the
//! stored roles and active tenant memberships, apply the tenant-admin
//! promotion rule, persist a promotion if one happened, then build the
//! response from the reconciled roles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tenantry_auth::{
    reconcile_global_roles, verify_password, AuthError, ExternalIdentity, Role, RoleCatalog, TenantRoleGrant,
    TokenError, TokenIssuer, VerifiedIdentity,
};
use tenantry_core::{TenantId, UserId};
use tenantry_infra::{
    ExternalGrant, ExternalProfile, Membership, NewTenant, NewUser, ProfileLookup, SharedDirectory, SharedProfiles,
    StoreError, TenantRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad credentials, unknown or inactive account; deliberately vague.
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid external token")]
    InvalidExternalToken,

    /// The federated exchange hit a directory failure part way through.
    /// Writes made before the failure are kept.
    #[error("SSO authentication failed")]
    FederationFailed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRoleSummary {
    pub id: TenantId,
    pub name: String,
    pub code: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Empty when describing an existing session.
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub tenants: Vec<TenantRoleSummary>,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub response: LoginResponse,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionService {
    directory: SharedDirectory,
    profiles: SharedProfiles,
    issuer: Arc<TokenIssuer>,
    catalog: RoleCatalog,
}

impl SessionService {
    pub fn new(directory: SharedDirectory, profiles: SharedProfiles, issuer: Arc<TokenIssuer>, catalog: RoleCatalog) -> Self {
        Self {
            directory,
            profiles,
            issuer,
            catalog,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let user = self.directory.find_user_by_email(email).await?;

        let user = match check_credentials(user, password) {
            Ok(user) => user,
            Err(reason) => {
                info!(%reason, "login rejected");
                return Err(SessionError::Unauthorized);
            }
        };

        let session = self.issue_for(&user).await?;
        info!(user_id = %user.id, "login succeeded");
        Ok(session)
    }

    /// Describe the caller's session from the directory's current state.
    pub async fn current(&self, user_id: &UserId) -> Result<LoginResponse, SessionError> {
        let user = match self.directory.find_user(user_id).await? {
            Some(user) if user.is_active => user,
            _ => return Err(SessionError::Unauthorized),
        };

        let (roles, memberships) = self.resolve_roles(&user).await?;
        Ok(login_response(&user, String::new(), &roles, &memberships))
    }

    /// Exchange an externally issued identity token for a local session,
    /// provisioning the user (and their tenants) on first sight.
    pub async fn exchange_external(&self, external_token: &str) -> Result<Session, SessionError> {
        let identity = ExternalIdentity::parse(external_token).map_err(|e| {
            info!(error = %e, "external token rejected");
            SessionError::InvalidExternalToken
        })?;

        let profile = match self
            .profiles
            .lookup(external_token, identity.subject.as_deref(), &identity.email)
            .await
        {
            ProfileLookup::Found(profile) => Some(profile),
            ProfileLookup::NotFound => {
                debug!(email = %identity.email, "no external profile; continuing");
                None
            }
            ProfileLookup::Unavailable(reason) => {
                warn!(%reason, "profile directory unavailable; continuing without profile data");
                None
            }
        };

        let existing = self
            .directory
            .find_user_by_email(&identity.email)
            .await
            .map_err(federation_failure)?;

        let user = match existing {
            Some(user) => user,
            None => self.provision_user(&identity, profile.as_ref()).await?,
        };

        if !user.is_active {
            info!(user_id = %user.id, "federated sign-in rejected: account inactive");
            return Err(SessionError::Unauthorized);
        }

        self.issue_for(&user).await.map_err(|e| match e {
            SessionError::Store(e) => federation_failure(e),
            other => other,
        })
    }

    async fn provision_user(
        &self,
        identity: &ExternalIdentity,
        profile: Option<&ExternalProfile>,
    ) -> Result<UserRecord, SessionError> {
        let first_name = profile
            .and_then(|p| p.first_name.clone())
            .or_else(|| identity.given_name.clone())
            .unwrap_or_else(|| "User".to_string());
        let last_name = profile
            .and_then(|p| p.last_name.clone())
            .or_else(|| identity.family_name.clone())
            .unwrap_or_default();

        let created = self
            .directory
            .create_user(NewUser {
                email: identity.email.clone(),
                first_name,
                last_name,
                email_confirmed: true,
                password_hash: None,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                // Another exchange for the same email won the race; it owns provisioning.
                info!(email = %identity.email, "user created concurrently; skipping provisioning");
                return self
                    .directory
                    .find_user_by_email(&identity.email)
                    .await
                    .map_err(federation_failure)?
                    .ok_or(SessionError::FederationFailed);
            }
            Err(e) => return Err(federation_failure(e)),
        };

        info!(user_id = %user.id, "provisioned federated user");

        for grant in profile.map(|p| p.grants.as_slice()).unwrap_or_default() {
            self.provision_grant(&user, grant).await.map_err(federation_failure)?;
        }

        Ok(user)
    }

    async fn provision_grant(&self, user: &UserRecord, grant: &ExternalGrant) -> Result<(), StoreError> {
        let tenant = self.find_or_create_tenant(grant).await?;
        let role = grant
            .roles
            .iter()
            .map(|r| r.trim())
            .find(|r| !r.is_empty())
            .map(|r| Role::new(r.to_string()))
            .unwrap_or_else(|| self.catalog.member.clone());

        let outcome = self.directory.assign_tenant_role(&user.id, tenant.id, &role).await?;
        info!(user_id = %user.id, tenant = %tenant.code, %role, ?outcome, "provisioned tenant membership");
        Ok(())
    }

    async fn find_or_create_tenant(&self, grant: &ExternalGrant) -> Result<TenantRecord, StoreError> {
        if let Some(tenant) = self.directory.find_tenant_by_code(&grant.tenant_code).await? {
            return Ok(tenant);
        }

        let name = if grant.tenant_name.trim().is_empty() {
            grant.tenant_code.clone()
        } else {
            grant.tenant_name.clone()
        };

        let created = self
            .directory
            .create_tenant(NewTenant {
                description: Some(format!("Tenant from Platform: {name}")),
                name,
                code: grant.tenant_code.clone(),
            })
            .await;

        match created {
            Ok(tenant) => {
                info!(tenant = %tenant.code, "provisioned tenant");
                Ok(tenant)
            }
            Err(StoreError::Conflict(_)) => self
                .directory
                .find_tenant_by_code(&grant.tenant_code)
                .await?
                .ok_or(StoreError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Reconcile global roles against tenant memberships and persist a
    /// promotion if one is due.
    async fn resolve_roles(&self, user: &UserRecord) -> Result<(Vec<Role>, Vec<Membership>), StoreError> {
        let current = self.directory.global_roles(&user.id).await?;
        let memberships = self.directory.active_memberships(&user.id).await?;
        let grants: Vec<TenantRoleGrant> = memberships.iter().filter_map(Membership::grant).collect();

        let reconciled = reconcile_global_roles(&current, &grants, &self.catalog);
        if let Some(role) = &reconciled.promoted {
            if self.directory.add_global_role(&user.id, role).await? {
                info!(user_id = %user.id, %role, "promoted global role from tenant membership");
            }
        }

        Ok((reconciled.roles, memberships))
    }

    async fn issue_for(&self, user: &UserRecord) -> Result<Session, SessionError> {
        let (roles, memberships) = self.resolve_roles(user).await?;
        let grants: Vec<TenantRoleGrant> = memberships.iter().filter_map(Membership::grant).collect();
        if grants.len() != memberships.len() {
            warn!(user_id = %user.id, "some tenant roles could not be encoded and were left out of the token");
        }

        let identity = VerifiedIdentity::new(user.id.clone(), user.email.clone(), user.display_name());
        let issued = self.issuer.issue(&identity, &roles, &grants)?;

        Ok(Session {
            response: login_response(user, issued.token, &roles, &memberships),
            expires_at: issued.expires_at,
        })
    }
}

fn check_credentials(user: Option<UserRecord>, password: &str) -> Result<UserRecord, AuthError> {
    let user = user.ok_or(AuthError::InvalidCredentials)?;
    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }
    let hash = user.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
    if verify_password(password, hash)? {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

fn federation_failure(err: StoreError) -> SessionError {
    error!(error = %err, "federated sign-in failed");
    SessionError::FederationFailed
}

fn login_response(user: &UserRecord, token: String, roles: &[Role], memberships: &[Membership]) -> LoginResponse {
    LoginResponse {
        token,
        user_id: user.id.to_string(),
        email: user.email.clone(),
        full_name: user.display_name(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        tenants: memberships
            .iter()
            .map(|m| TenantRoleSummary {
                id: m.tenant.id,
                name: m.tenant.name.clone(),
                code: m.tenant.code.clone(),
                role: m.role.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde_json::json;

    use tenantry_auth::{hash_password, TokenSettings, TokenValidator};
    use tenantry_infra::{DirectoryStore, InMemoryDirectory, StaticProfileDirectory};

    use super::*;

    struct Harness {
        directory: Arc<InMemoryDirectory>,
        profiles: Arc<StaticProfileDirectory>,
        issuer: Arc<TokenIssuer>,
        service: SessionService,
    }

    fn harness() -> Harness {
        let directory = Arc::new(InMemoryDirectory::new());
        let profiles = Arc::new(StaticProfileDirectory::new());
        let issuer = Arc::new(TokenIssuer::new(TokenSettings::new("session-test-key", "Compliance", "Compliance")).unwrap());
        let service = SessionService::new(directory.clone(), profiles.clone(), issuer.clone(), RoleCatalog::compliance());
        Harness {
            directory,
            profiles,
            issuer,
            service,
        }
    }

    fn external_token(email: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": format!("kc-{email}"), "email": email, "given_name": "Fed", "family_name": "User" }),
            &EncodingKey::from_secret(b"provider"),
        )
        .unwrap()
    }

    async fn user_with_password(dir: &InMemoryDirectory, email: &str, password: &str) -> UserRecord {
        dir.create_user(NewUser {
            email: email.into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email_confirmed: true,
            password_hash: Some(hash_password(password).unwrap()),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn login_issues_token_with_tenant_roles() {
        let h = harness();
        let user = user_with_password(&h.directory, "jane@x.com", "pw").await;
        let tenant = h
            .directory
            .create_tenant(NewTenant { name: "Acme".into(), code: "ACME".into(), description: None })
            .await
            .unwrap();
        h.directory.assign_tenant_role(&user.id, tenant.id, &Role::new("User")).await.unwrap();

        let session = h.service.login("JANE@x.com", "pw").await.unwrap();
        assert_eq!(session.response.full_name, "Jane Doe");
        assert_eq!(session.response.tenants[0].code, "ACME");

        let claims = h.issuer.validator().validate(&session.response.token, Utc::now()).unwrap();
        assert_eq!(claims.tenant_roles, vec![format!("{}:User", tenant.id)]);
        assert_eq!(session.expires_at.timestamp(), claims.exp);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let h = harness();
        let user = user_with_password(&h.directory, "jane@x.com", "pw").await;

        assert!(matches!(h.service.login("nobody@x.com", "pw").await, Err(SessionError::Unauthorized)));
        assert!(matches!(h.service.login("jane@x.com", "wrong").await, Err(SessionError::Unauthorized)));

        h.directory.deactivate_user(&user.id).await.unwrap();
        assert!(matches!(h.service.login("jane@x.com", "pw").await, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn tenant_admin_membership_promotes_once() {
        let h = harness();
        let user = user_with_password(&h.directory, "jane@x.com", "pw").await;
        let tenant = h
            .directory
            .create_tenant(NewTenant { name: "Acme".into(), code: "ACME".into(), description: None })
            .await
            .unwrap();
        h.directory.assign_tenant_role(&user.id, tenant.id, &Role::new("GroupAdmin")).await.unwrap();

        let first = h.service.login("jane@x.com", "pw").await.unwrap();
        assert_eq!(first.response.roles, vec!["GroupAdmin".to_string()]);
        let second = h.service.login("jane@x.com", "pw").await.unwrap();
        assert_eq!(second.response.roles, vec!["GroupAdmin".to_string()]);
        assert_eq!(h.directory.global_roles(&user.id).await.unwrap(), vec![Role::new("GroupAdmin")]);
    }

    #[tokio::test]
    async fn current_session_has_empty_token() {
        let h = harness();
        let user = user_with_password(&h.directory, "jane@x.com", "pw").await;
        let me = h.service.current(&user.id).await.unwrap();
        assert!(me.token.is_empty());
        assert_eq!(me.email, "jane@x.com");

        h.directory.deactivate_user(&user.id).await.unwrap();
        assert!(matches!(h.service.current(&user.id).await, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn federated_sign_in_provisions_user_and_tenants() {
        let h = harness();
        h.profiles.insert(
            "fed@x.com",
            ExternalProfile {
                id: "p-1".into(),
                first_name: Some("Platform".into()),
                last_name: Some("Person".into()),
                grants: vec![
                    ExternalGrant { tenant_code: "ACME".into(), tenant_name: "Acme".into(), roles: vec!["GroupAdmin".into()] },
                    ExternalGrant { tenant_code: "BETA".into(), tenant_name: "Beta".into(), roles: vec![] },
                ],
            },
        );

        let session = h.service.exchange_external(&external_token("fed@x.com")).await.unwrap();
        assert_eq!(session.response.full_name, "Platform Person");
        assert_eq!(session.response.roles, vec!["GroupAdmin".to_string()]);

        let mut roles: Vec<_> = session.response.tenants.iter().map(|t| (t.code.clone(), t.role.clone())).collect();
        roles.sort();
        assert_eq!(roles, vec![("ACME".into(), "GroupAdmin".into()), ("BETA".into(), "User".into())]);

        let user = h.directory.find_user_by_email("fed@x.com").await.unwrap().unwrap();
        assert!(user.email_confirmed);
        assert!(user.password_hash.is_none());
        assert_eq!(h.directory.list_active_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn federated_sign_in_survives_profile_outage() {
        let h = harness();
        h.profiles.set_unavailable(Some("timeout".into()));

        let session = h.service.exchange_external(&external_token("fed@x.com")).await.unwrap();
        assert_eq!(session.response.full_name, "Fed User");
        assert!(session.response.tenants.is_empty());
    }

    #[tokio::test]
    async fn federated_sign_in_reuses_existing_user_without_reprovisioning() {
        let h = harness();
        let existing = user_with_password(&h.directory, "fed@x.com", "pw").await;
        h.profiles.insert(
            "fed@x.com",
            ExternalProfile {
                id: "p-1".into(),
                first_name: None,
                last_name: None,
                grants: vec![ExternalGrant { tenant_code: "ACME".into(), tenant_name: "Acme".into(), roles: vec![] }],
            },
        );

        let session = h.service.exchange_external(&external_token("fed@x.com")).await.unwrap();
        assert_eq!(session.response.user_id, existing.id.to_string());
        assert!(session.response.tenants.is_empty());
        assert!(h.directory.find_tenant_by_code("ACME").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_or_anonymous_external_tokens_are_rejected() {
        let h = harness();
        assert!(matches!(
            h.service.exchange_external("not-a-token").await,
            Err(SessionError::InvalidExternalToken)
        ));

        let no_email = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": "kc-1" }),
            &EncodingKey::from_secret(b"provider"),
        )
        .unwrap();
        assert!(matches!(
            h.service.exchange_external(&no_email).await,
            Err(SessionError::InvalidExternalToken)
        ));
        assert!(h.directory.list_active_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inactive_federated_user_is_rejected() {
        let h = harness();
        let user = user_with_password(&h.directory, "fed@x.com", "pw").await;
        h.directory.deactivate_user(&user.id).await.unwrap();
        assert!(matches!(
            h.service.exchange_external(&external_token("fed@x.com")).await,
            Err(SessionError::Unauthorized)
        ));
    }
}
