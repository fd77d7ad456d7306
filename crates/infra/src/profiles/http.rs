use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExternalGrant, ExternalProfile, ProfileDirectory, ProfileLookup};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformUser {
    id: String,
    #[serde(default)]
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    keycloak_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppLink {
    #[serde(default)]
    tenant_name: String,
    #[serde(default)]
    tenant_code: String,
    #[serde(default)]
    app_code: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Platform API client.
///
/// Every request is bounded by the configured timeout; the base URL is
/// stored without a trailing slash.
#[derive(Debug, Clone)]
pub struct HttpProfileDirectory {
    base_url: String,
    app_code: String,
    client: Client,
}

impl HttpProfileDirectory {
    pub fn new(base_url: &str, app_code: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(timeout).timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_code: app_code.into(),
            client,
        })
    }

    async fn fetch_users(&self, bearer: &str) -> Result<Vec<PlatformUser>, String> {
        let response = self
            .client
            .get(format!("{}/platformusers", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| format!("platform users request failed: {e}"))?;

        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| format!("platform users response unreadable: {e}")),
            status => Err(format!("platform users returned status {status}")),
        }
    }

    async fn fetch_grants(&self, bearer: &str, user_id: &str) -> Result<Vec<ExternalGrant>, String> {
        let response = self
            .client
            .get(format!("{}/userapplinks/user/{user_id}", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| format!("app links request failed: {e}"))?;

        if response.status() != StatusCode::OK {
            return Err(format!("app links returned status {}", response.status()));
        }

        let links: Vec<AppLink> = response
            .json()
            .await
            .map_err(|e| format!("app links response unreadable: {e}"))?;

        Ok(links
            .into_iter()
            .filter(|l| l.is_active && l.app_code == self.app_code && !l.tenant_code.trim().is_empty())
            .map(|l| ExternalGrant {
                tenant_code: l.tenant_code,
                tenant_name: l.tenant_name,
                roles: l.roles,
            })
            .collect())
    }
}

#[async_trait]
impl ProfileDirectory for HttpProfileDirectory {
    async fn lookup(&self, bearer: &str, subject: Option<&str>, email: &str) -> ProfileLookup {
        let users = match self.fetch_users(bearer).await {
            Ok(users) => users,
            Err(reason) => return ProfileLookup::Unavailable(reason),
        };

        let Some(user) = users.into_iter().find(|u| {
            subject.is_some_and(|s| u.keycloak_user_id.as_deref() == Some(s))
                || u.email.eq_ignore_ascii_case(email)
        }) else {
            debug!(email, "no platform profile for external identity");
            return ProfileLookup::NotFound;
        };

        let grants = match self.fetch_grants(bearer, &user.id).await {
            Ok(grants) => grants,
            Err(reason) => {
                warn!(platform_user = %user.id, %reason, "app link lookup failed; continuing without grants");
                Vec::new()
            }
        };

        ProfileLookup::Found(ExternalProfile {
            id: user.id,
            first_name: user.first_name.filter(|n| !n.trim().is_empty()),
            last_name: user.last_name.filter(|n| !n.trim().is_empty()),
            grants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    fn platform() -> Router {
        Router::new()
            .route(
                "/api/platformusers",
                get(|| async {
                    Json(json!([
                        { "id": "p-1", "email": "Jane@X.com", "firstName": "Jane", "lastName": "Doe", "keycloakUserId": "kc-1" },
                        { "id": "p-2", "email": "bob@x.com", "firstName": "Bob", "lastName": "", "keycloakUserId": null },
                    ]))
                }),
            )
            .route(
                "/api/userapplinks/user/:id",
                get(|Path(id): Path<String>| async move {
                    if id != "p-1" {
                        return Err(AxumStatus::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json::<Value>(json!([
                        { "id": "l1", "platformUserId": "p-1", "tenantId": "t1", "tenantName": "Acme", "tenantCode": "ACME", "appCode": "Compliance", "roles": ["GroupAdmin", "User"], "isActive": true },
                        { "id": "l2", "platformUserId": "p-1", "tenantId": "t2", "tenantName": "Other", "tenantCode": "OTH", "appCode": "TDH", "roles": ["User"], "isActive": true },
                        { "id": "l3", "platformUserId": "p-1", "tenantId": "t3", "tenantName": "Gone", "tenantCode": "GONE", "appCode": "Compliance", "roles": ["User"], "isActive": false },
                    ])))
                }),
            )
    }

    fn directory(base: &str) -> HttpProfileDirectory {
        HttpProfileDirectory::new(base, "Compliance", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn finds_profile_and_filters_links_to_this_app() {
        let base = spawn(platform()).await;
        let lookup = directory(&base).lookup("tok", None, "jane@x.com").await;

        let ProfileLookup::Found(profile) = lookup else {
            panic!("expected a profile, got {lookup:?}");
        };
        assert_eq!(profile.id, "p-1");
        assert_eq!(profile.first_name.as_deref(), Some("Jane"));
        assert_eq!(
            profile.grants,
            vec![ExternalGrant {
                tenant_code: "ACME".into(),
                tenant_name: "Acme".into(),
                roles: vec!["GroupAdmin".into(), "User".into()],
            }]
        );
    }

    #[tokio::test]
    async fn matches_on_external_subject() {
        let base = spawn(platform()).await;
        let lookup = directory(&base).lookup("tok", Some("kc-1"), "renamed@x.com").await;
        assert!(matches!(lookup, ProfileLookup::Found(p) if p.id == "p-1"));
    }

    #[tokio::test]
    async fn link_failure_degrades_to_no_grants() {
        let base = spawn(platform()).await;
        let lookup = directory(&base).lookup("tok", None, "bob@x.com").await;
        let ProfileLookup::Found(profile) = lookup else {
            panic!("expected a profile, got {lookup:?}");
        };
        assert!(profile.grants.is_empty());
        assert_eq!(profile.last_name, None);
    }

    #[tokio::test]
    async fn unknown_person_is_not_found() {
        let base = spawn(platform()).await;
        let lookup = directory(&base).lookup("tok", None, "nobody@x.com").await;
        assert_eq!(lookup, ProfileLookup::NotFound);
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let router = Router::new().route("/api/platformusers", get(|| async { AxumStatus::SERVICE_UNAVAILABLE }));
        let base = spawn(router).await;
        let lookup = directory(&base).lookup("tok", None, "jane@x.com").await;
        assert!(matches!(lookup, ProfileLookup::Unavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let lookup = directory(&format!("http://{addr}/api"))
            .lookup("tok", None, "jane@x.com")
            .await;
        assert!(matches!(lookup, ProfileLookup::Unavailable(_)));
    }
}
