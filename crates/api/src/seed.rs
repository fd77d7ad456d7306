//! First-run bootstrap of the admin account.

use thiserror::Error;
use tracing::{info, warn};

use tenantry_auth::{hash_password, AuthError, RoleCatalog};
use tenantry_infra::{DirectoryStore, NewUser, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] AuthError),
}

/// Create the admin account when the directory has no users at all.
/// Returns whether an account was created.
pub async fn seed_admin(
    directory: &dyn DirectoryStore,
    catalog: &RoleCatalog,
    email: &str,
    password: &str,
) -> Result<bool, SeedError> {
    if directory.has_users().await? {
        return Ok(false);
    }

    let user = match directory
        .create_user(NewUser {
            email: email.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            email_confirmed: true,
            password_hash: Some(hash_password(password)?),
        })
        .await
    {
        Ok(user) => user,
        // Another instance seeded first.
        Err(StoreError::Conflict(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    directory.add_global_role(&user.id, &catalog.global_admin).await?;
    info!(user_id = %user.id, email, "seeded admin account");
    Ok(true)
}

/// Seed and log; a failed seed never stops the server.
pub async fn run(directory: &dyn DirectoryStore, catalog: &RoleCatalog, email: &str, password: &str) {
    if let Err(e) = seed_admin(directory, catalog, email, password).await {
        warn!(error = %e, "admin seeding failed");
    }
}
