//! Service wiring shared by every handler.

use std::sync::Arc;

use tenantry_auth::{
    RequireRole, RoleCatalog, TenantAdminOrAppAdmin, TokenError, TokenIssuer, TokenSettings,
    TokenValidator,
};
use tenantry_infra::{SharedDirectory, SharedProfiles};

use crate::app::session::SessionService;
use crate::config::{AppConfig, CookieConfig};

pub struct AppServices {
    pub catalog: RoleCatalog,
    pub directory: SharedDirectory,
    pub session: SessionService,
    pub validator: Arc<dyn TokenValidator>,
    pub cookie: CookieConfig,
    /// Global admin, global tenant admin, or tenant admin anywhere.
    pub admin_policy: TenantAdminOrAppAdmin,
    /// Global admin only.
    pub global_admin_policy: RequireRole,
}

impl AppServices {
    /// Fails only when the signing key is missing.
    pub fn new(config: &AppConfig, directory: SharedDirectory, profiles: SharedProfiles) -> Result<Self, TokenError> {
        let catalog = config.profile.catalog();
        let issuer = Arc::new(TokenIssuer::new(TokenSettings::new(
            config.jwt_key.as_bytes().to_vec(),
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
        ))?);

        Ok(Self {
            admin_policy: TenantAdminOrAppAdmin::from_catalog(&catalog),
            global_admin_policy: RequireRole::new(catalog.global_admin.clone()),
            validator: Arc::new(issuer.validator()),
            session: SessionService::new(directory.clone(), profiles, issuer, catalog.clone()),
            cookie: config.cookie.clone(),
            directory,
            catalog,
        })
    }
}
