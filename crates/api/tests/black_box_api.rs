use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::{json, Value};

use tenantry_api::app::{build_app, services::AppServices};
use tenantry_api::config::AppConfig;
use tenantry_auth::{Role, SessionClaims};
use tenantry_core::TenantId;
use tenantry_infra::{ExternalGrant, ExternalProfile, InMemoryDirectory, StaticProfileDirectory};

const JWT_KEY: &str = "black-box-signing-key";
const ADMIN_EMAIL: &str = "admin@compliance.com";
const ADMIN_PASSWORD: &str = "Admin@123";

struct TestServer {
    base_url: String,
    profiles: Arc<StaticProfileDirectory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let vars: HashMap<&str, &str> = [("JWT_KEY", JWT_KEY)].into_iter().collect();
        let config = AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        let directory = Arc::new(InMemoryDirectory::new());
        let profiles = Arc::new(StaticProfileDirectory::new());
        let services = Arc::new(AppServices::new(&config, directory.clone(), profiles.clone()).unwrap());

        tenantry_api::seed::seed_admin(directory.as_ref(), &services.catalog, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            profiles,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(roles: &[&str], tenant_roles: &[String]) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: "minted-user".parse().unwrap(),
        email: "minted@x.com".into(),
        name: "Minted User".into(),
        roles: roles.iter().map(|r| Role::new(r.to_string())).collect(),
        tenant_roles: tenant_roles.to_vec(),
        iss: "Compliance".into(),
        aud: "Compliance".into(),
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
        jti: "test".into(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_KEY.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn external_token(email: &str) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &json!({ "sub": format!("kc-{email}"), "email": email, "given_name": "Fed", "family_name": "User" }),
        &EncodingKey::from_secret(b"identity-provider-key"),
    )
    .unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> reqwest::Response {
    client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
}

async fn admin_token(client: &reqwest::Client, srv: &TestServer) -> String {
    let res = login(client, srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_tenant(client: &reqwest::Client, srv: &TestServer, token: &str, code: &str) -> String {
    let res = client
        .post(srv.url("/api/tenants"))
        .bearer_auth(token)
        .json(&json!({ "name": format!("Tenant {code}"), "code": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn create_user(client: &reqwest::Client, srv: &TestServer, token: &str, email: &str) -> String {
    let res = client
        .post(srv.url("/api/users"))
        .bearer_auth(token)
        .json(&json!({ "email": email, "password": "pw-123", "firstName": "New", "lastName": "Person" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn seeded_admin_can_log_in_and_gets_a_cookie() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = login(&client, &srv, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = res.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("authToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=28800"));

    let body: Value = res.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["fullName"], "Admin User");
    assert_eq!(body["roles"], json!(["AppAdmin"]));
    assert_eq!(body["tenants"], json!([]));
}

#[tokio::test]
async fn bad_credentials_get_one_generic_answer() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let wrong_password = login(&client, &srv, ADMIN_EMAIL, "nope").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let a: Value = wrong_password.json().await.unwrap();

    let unknown_user = login(&client, &srv, "ghost@x.com", "nope").await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let b: Value = unknown_user.json().await.unwrap();

    assert_eq!(a, b);
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer_and_returns_no_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &srv).await;

    let via_cookie = client
        .get(srv.url("/api/auth/me"))
        .header(COOKIE, format!("authToken={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(via_cookie.status(), StatusCode::OK);
    let body: Value = via_cookie.json().await.unwrap();
    assert_eq!(body["token"], "");
    assert_eq!(body["email"], ADMIN_EMAIL);

    let via_bearer = client.get(srv.url("/api/auth/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(via_bearer.status(), StatusCode::OK);
}

#[tokio::test]
async fn cookie_takes_precedence_over_bearer() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &srv).await;

    let res = client
        .get(srv.url("/api/auth/me"))
        .header(COOKIE, "authToken=garbage")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_endpoints_require_a_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/api/auth/me", "/api/tenants", "/api/users"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthorized");
    }

    let res = client.get(srv.url("/api/tenants")).bearer_auth("not.a.jwt").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let now = Utc::now();
    let expired = SessionClaims {
        sub: "u".parse().unwrap(),
        email: "u@x.com".into(),
        name: "U".into(),
        roles: vec![Role::new("AppAdmin")],
        tenant_roles: vec![],
        iss: "Compliance".into(),
        aud: "Compliance".into(),
        iat: (now - ChronoDuration::hours(9)).timestamp(),
        exp: (now - ChronoDuration::hours(1)).timestamp(),
        jti: "old".into(),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &expired,
        &EncodingKey::from_secret(JWT_KEY.as_bytes()),
    )
    .unwrap();
    let res = client.get(srv.url("/api/users")).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let foreign = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &SessionClaims { exp: (now + ChronoDuration::hours(1)).timestamp(), ..expired },
        &EncodingKey::from_secret(b"some-other-key"),
    )
    .unwrap();
    let res = client.get(srv.url("/api/users")).bearer_auth(foreign).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn composite_policy_on_user_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let tenant = TenantId::new();

    let cases = [
        (mint_jwt(&["AppAdmin"], &[]), StatusCode::OK),
        (mint_jwt(&["GroupAdmin"], &[]), StatusCode::OK),
        (mint_jwt(&["User"], &[format!("{tenant}:GroupAdmin")]), StatusCode::OK),
        (mint_jwt(&["User"], &["not-a-uuid:GroupAdmin".to_string()]), StatusCode::OK),
        (mint_jwt(&["User"], &[format!("{tenant}:User")]), StatusCode::FORBIDDEN),
        (mint_jwt(&["User"], &["GroupAdmin".to_string(), "a:b:GroupAdmin".to_string()]), StatusCode::FORBIDDEN),
        (mint_jwt(&[], &[]), StatusCode::FORBIDDEN),
    ];

    for (token, expected) in cases {
        let res = client.get(srv.url("/api/users")).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), expected);
    }
}

#[tokio::test]
async fn tenant_admin_cannot_manage_tenants() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(&["GroupAdmin"], &[]);

    let res = client
        .post(srv.url("/api/tenants"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Acme", "code": "ACME" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn tenant_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &srv).await;

    let id = create_tenant(&client, &srv, &token, "ACME").await;

    let dup = client
        .post(srv.url("/api/tenants"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Other", "code": "ACME" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url(&format!("/api/tenants/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Acme Corp", "description": "renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Acme Corp");
    assert!(!body["modifiedAt"].is_null());

    let res = client.delete(srv.url(&format!("/api/tenants/{id}"))).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let list: Value = client
        .get(srv.url("/api/tenants"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list, json!([]));

    let res = client.get(srv.url("/api/tenants/not-a-uuid")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assignment_is_reflected_at_next_login_while_old_token_stays_valid() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv).await;

    let tenant_id = create_tenant(&client, &srv, &admin, "ACME").await;
    let user_id = create_user(&client, &srv, &admin, "member@x.com").await;

    let before: Value = login(&client, &srv, "member@x.com", "pw-123").await.json().await.unwrap();
    let old_token = before["token"].as_str().unwrap().to_string();
    assert_eq!(before["tenants"], json!([]));

    let res = client.get(srv.url("/api/users")).bearer_auth(&old_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/api/usertenants/assign"))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "tenantId": tenant_id, "role": "GroupAdmin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The old token still carries the old claims until it expires.
    let res = client.get(srv.url("/api/users")).bearer_auth(&old_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let after: Value = login(&client, &srv, "member@x.com", "pw-123").await.json().await.unwrap();
    assert_eq!(after["roles"], json!(["GroupAdmin"]));
    assert_eq!(after["tenants"][0]["role"], "GroupAdmin");
    assert_eq!(after["tenants"][0]["code"], "ACME");

    let new_token = after["token"].as_str().unwrap();
    let res = client.get(srv.url("/api/users")).bearer_auth(new_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let members: Value = client
        .get(srv.url(&format!("/api/usertenants/tenant/{tenant_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(members[0]["email"], "member@x.com");
}

#[tokio::test]
async fn assignment_rejects_unknown_roles_and_unassign_is_soft() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv).await;

    let tenant_id = create_tenant(&client, &srv, &admin, "ACME").await;
    let user_id = create_user(&client, &srv, &admin, "member@x.com").await;

    let res = client
        .post(srv.url("/api/usertenants/assign"))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "tenantId": tenant_id, "role": "Owner" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/api/usertenants/assign"))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "tenantId": tenant_id, "role": "User" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/api/usertenants/unassign"))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "tenantId": tenant_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let memberships: Value = client
        .get(srv.url(&format!("/api/usertenants/user/{user_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(memberships, json!([]));

    let res = client
        .post(srv.url("/api/usertenants/assign"))
        .bearer_auth(&admin)
        .json(&json!({ "userId": user_id, "tenantId": tenant_id, "role": "User" }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["outcome"], "reactivated");
}

#[tokio::test]
async fn only_global_admin_grants_global_admin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/users"))
        .bearer_auth(mint_jwt(&["GroupAdmin"], &[]))
        .json(&json!({ "email": "boss@x.com", "password": "pw", "roles": ["AppAdmin"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = admin_token(&client, &srv).await;
    let res = client
        .post(srv.url("/api/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "boss@x.com", "password": "pw", "roles": ["AppAdmin"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let dup = client
        .post(srv.url("/api/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "BOSS@x.com", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_users_can_no_longer_log_in() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv).await;
    let user_id = create_user(&client, &srv, &admin, "leaver@x.com").await;

    let res = client.delete(srv.url(&format!("/api/users/{user_id}"))).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = login(&client, &srv, "leaver@x.com", "pw-123").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url(&format!("/api/users/{user_id}"))).bearer_auth(&admin).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isActive"], false);
}

#[tokio::test]
async fn updating_a_user_can_reset_the_password() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv).await;
    let user_id = create_user(&client, &srv, &admin, "rotate@x.com").await;

    let res = client
        .put(srv.url(&format!("/api/users/{user_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "firstName": "Re", "lastName": "Named", "password": "fresh-456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["fullName"], "Re Named");

    assert_eq!(login(&client, &srv, "rotate@x.com", "pw-123").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(&client, &srv, "rotate@x.com", "fresh-456").await.status(), StatusCode::OK);

    // Omitted or empty password leaves the current one in place.
    let res = client
        .put(srv.url(&format!("/api/users/{user_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "firstName": "Re", "lastName": "Named", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(login(&client, &srv, "rotate@x.com", "fresh-456").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn sso_provisions_a_confirmed_user_with_platform_tenants() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    srv.profiles.insert(
        "fed@x.com",
        ExternalProfile {
            id: "p-1".into(),
            first_name: Some("Fede".into()),
            last_name: Some("Rated".into()),
            grants: vec![ExternalGrant {
                tenant_code: "ACME".into(),
                tenant_name: "Acme".into(),
                roles: vec!["GroupAdmin".into()],
            }],
        },
    );

    let res = client
        .post(srv.url("/api/auth/sso"))
        .json(&json!({ "keycloakToken": external_token("fed@x.com") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(SET_COOKIE));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["fullName"], "Fede Rated");
    assert_eq!(body["roles"], json!(["GroupAdmin"]));
    assert_eq!(body["tenants"][0]["code"], "ACME");

    // The issued session passes the composite policy through the tenant grant.
    let token = body["token"].as_str().unwrap();
    let res = client.get(srv.url("/api/users")).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: Value = res.json().await.unwrap();
    let fed = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "fed@x.com")
        .unwrap();
    assert_eq!(fed["emailConfirmed"], true);

    // No password was set, so password login is impossible.
    let res = login(&client, &srv, "fed@x.com", "").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn concurrent_sso_for_a_new_email_creates_one_user() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = external_token("race@x.com");

    let requests = (0..6).map(|_| {
        client
            .post(srv.url("/api/auth/sso"))
            .json(&json!({ "keycloakToken": token }))
            .send()
    });
    let responses = send_all(requests).await;
    assert!(responses.iter().any(|s| *s == StatusCode::OK));

    let admin = admin_token(&client, &srv).await;
    let users: Value = client
        .get(srv.url("/api/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let count = users.as_array().unwrap().iter().filter(|u| u["email"] == "race@x.com").count();
    assert_eq!(count, 1);
}

async fn send_all<F>(futures: impl Iterator<Item = F>) -> Vec<StatusCode>
where
    F: std::future::Future<Output = reqwest::Result<reqwest::Response>> + Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut statuses = Vec::with_capacity(handles.len());
    for h in handles {
        statuses.push(h.await.unwrap().unwrap().status());
    }
    statuses
}

#[tokio::test]
async fn sso_rejects_malformed_tokens_without_provisioning() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/auth/sso"))
        .json(&json!({ "keycloakToken": "definitely-not-a-jwt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn sso_survives_a_profile_directory_outage() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.profiles.set_unavailable(Some("connect timeout".into()));

    let res = client
        .post(srv.url("/api/auth/sso"))
        .json(&json!({ "keycloakToken": external_token("solo@x.com") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["fullName"], "Fed User");
    assert_eq!(body["tenants"], json!([]));
}

#[tokio::test]
async fn logout_clears_the_cookie_and_is_idempotent() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client.post(srv.url("/api/auth/logout")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("authToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
