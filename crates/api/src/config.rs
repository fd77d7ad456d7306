//! Process configuration, read from the environment.

use std::env;
use std::time::Duration;

use thiserror::Error;

use tenantry_auth::AppProfile;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_KEY must be set to a non-empty signing key")]
    MissingJwtKey,

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// `None` disables external profile lookups.
    pub api_url: Option<String>,
    pub app_code: String,
    pub timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub profile: AppProfile,
    pub jwt_key: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub bind_addr: String,
    pub cookie: CookieConfig,
    pub platform: PlatformConfig,
    pub database_url: Option<String>,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("profile", &self.profile)
            .field("jwt_key", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("bind_addr", &self.bind_addr)
            .field("cookie", &self.cookie)
            .field("platform", &self.platform)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("seed_admin_email", &self.seed_admin_email)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let profile = match var("APP_PROFILE") {
            Some(raw) => raw
                .parse::<AppProfile>()
                .map_err(|reason| ConfigError::Invalid { name: "APP_PROFILE", reason })?,
            None => AppProfile::default(),
        };

        let jwt_key = var("JWT_KEY").ok_or(ConfigError::MissingJwtKey)?;

        let cookie_secure = match var("AUTH_COOKIE_SECURE") {
            Some(raw) => parse_bool("AUTH_COOKIE_SECURE", &raw)?,
            None => false,
        };

        let timeout_ms = match var("PLATFORM_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "PLATFORM_TIMEOUT_MS",
                reason: e.to_string(),
            })?,
            None => 5_000,
        };

        let profile_slug = profile.display_name().to_ascii_lowercase();

        Ok(Self {
            profile,
            jwt_key,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| profile.display_name().to_string()),
            jwt_audience: var("JWT_AUDIENCE").unwrap_or_else(|| profile.display_name().to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            cookie: CookieConfig {
                name: var("AUTH_COOKIE_NAME").unwrap_or_else(|| "authToken".to_string()),
                secure: cookie_secure,
            },
            platform: PlatformConfig {
                api_url: var("PLATFORM_API_URL"),
                app_code: var("PLATFORM_APP_CODE").unwrap_or_else(|| profile.app_code().to_string()),
                timeout: Duration::from_millis(timeout_ms),
            },
            database_url: var("DATABASE_URL"),
            seed_admin_email: var("SEED_ADMIN_EMAIL").unwrap_or_else(|| format!("admin@{profile_slug}.com")),
            seed_admin_password: var("SEED_ADMIN_PASSWORD").unwrap_or_else(|| "Admin@123".to_string()),
        })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
