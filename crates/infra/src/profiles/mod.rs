//! External profile directory.
//!
//! The platform service knows which tenants (by code) an externally
//! authenticated person belongs to in each application. It is consulted
//! during federated sign-in only; every lookup either yields a profile,
//! a definite "not registered", or `Unavailable` so callers can continue
//! without it.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

pub mod http;

pub use http::HttpProfileDirectory;

/// A tenant membership reported by the profile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalGrant {
    pub tenant_code: String,
    pub tenant_name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Already restricted to this application and to active links.
    pub grants: Vec<ExternalGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    Found(ExternalProfile),
    NotFound,
    /// Transport, status or decode failure.
    Unavailable(String),
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// `bearer` is the caller's external token, forwarded as-is.
    async fn lookup(&self, bearer: &str, subject: Option<&str>, email: &str) -> ProfileLookup;
}

pub type SharedProfiles = Arc<dyn ProfileDirectory>;

/// Used when no platform URL is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProfileDirectory;

#[async_trait]
impl ProfileDirectory for DisabledProfileDirectory {
    async fn lookup(&self, _bearer: &str, _subject: Option<&str>, _email: &str) -> ProfileLookup {
        ProfileLookup::NotFound
    }
}

/// Fixed set of profiles keyed by email (case-insensitive). Dev and tests.
#[derive(Debug, Default)]
pub struct StaticProfileDirectory {
    profiles: RwLock<Vec<(String, ExternalProfile)>>,
    unavailable: RwLock<Option<String>>,
}

impl StaticProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, email: &str, profile: ExternalProfile) -> Self {
        self.insert(email, profile);
        self
    }

    pub fn insert(&self, email: &str, profile: ExternalProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.retain(|(e, _)| !e.eq_ignore_ascii_case(email));
            profiles.push((email.to_string(), profile));
        }
    }

    /// Make every subsequent lookup report `Unavailable`.
    pub fn set_unavailable(&self, reason: Option<String>) {
        if let Ok(mut slot) = self.unavailable.write() {
            *slot = reason;
        }
    }
}

#[async_trait]
impl ProfileDirectory for StaticProfileDirectory {
    async fn lookup(&self, _bearer: &str, subject: Option<&str>, email: &str) -> ProfileLookup {
        if let Ok(slot) = self.unavailable.read() {
            if let Some(reason) = slot.as_ref() {
                return ProfileLookup::Unavailable(reason.clone());
            }
        }

        let Ok(profiles) = self.profiles.read() else {
            return ProfileLookup::Unavailable("profile table poisoned".into());
        };
        profiles
            .iter()
            .find(|(e, p)| e.eq_ignore_ascii_case(email) || subject.is_some_and(|s| s == p.id))
            .map(|(_, p)| ProfileLookup::Found(p.clone()))
            .unwrap_or(ProfileLookup::NotFound)
    }
}
