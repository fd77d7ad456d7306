use std::sync::Arc;

use anyhow::Context;

use tenantry_api::app::{build_app, services::AppServices};
use tenantry_api::config::AppConfig;
use tenantry_infra::{
    DisabledProfileDirectory, HttpProfileDirectory, InMemoryDirectory, SharedDirectory, SharedProfiles,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantry_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let directory = build_directory(&config).await?;
    let profiles = build_profiles(&config)?;

    let services = Arc::new(
        AppServices::new(&config, directory.clone(), profiles).context("failed to initialise token issuer")?,
    );

    tenantry_api::seed::run(
        directory.as_ref(),
        &services.catalog,
        &config.seed_admin_email,
        &config.seed_admin_password,
    )
    .await;

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, profile = config.profile.display_name(), "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_directory(config: &AppConfig) -> anyhow::Result<SharedDirectory> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory directory");
        return Ok(Arc::new(InMemoryDirectory::new()));
    };

    let pool = sqlx::PgPool::connect(url).await.context("failed to connect to Postgres")?;
    let directory = tenantry_infra::PostgresDirectory::new(pool);
    directory.ensure_schema().await.context("failed to create directory schema")?;
    Ok(Arc::new(directory))
}

#[cfg(not(feature = "postgres"))]
async fn build_directory(config: &AppConfig) -> anyhow::Result<SharedDirectory> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is disabled; using in-memory directory");
    }
    Ok(Arc::new(InMemoryDirectory::new()))
}

fn build_profiles(config: &AppConfig) -> anyhow::Result<SharedProfiles> {
    match config.platform.api_url.as_deref() {
        Some(url) => {
            let directory = HttpProfileDirectory::new(url, config.platform.app_code.clone(), config.platform.timeout)
                .context("failed to build platform API client")?;
            Ok(Arc::new(directory))
        }
        None => {
            tracing::info!("PLATFORM_API_URL not set; external profile lookups disabled");
            Ok(Arc::new(DisabledProfileDirectory))
        }
    }
}
