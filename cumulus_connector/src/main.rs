mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use cumulus_core::{CloudApi, Config, ExternalSystem, Updater};
use cumulus_external::{Client as ExternalClient, RestExternalSystem};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Any failure up to the point the loops are running is fatal (exit 1).
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    logging::init(&config.log_settings)?;
    tracing::info!(config = %cli.config.display(), "configuration loaded");

    let cloud_client = cumulus_cloud::Client::new(
        &config.api_server_settings.base_url,
        &config.auth_settings.client_id,
        &config.auth_settings.client_secret,
    )
    .context("failed to build cloud client")?;

    let subtree_root_id = cloud_client
        .get_registration_tenant_id(&config.auth_settings.client_id)
        .await
        .context("failed to discover the registration tenant")?;
    tracing::info!(tenant_id = %subtree_root_id, "registration tenant resolved");

    let cloud: Arc<dyn CloudApi> = Arc::new(cloud_client);
    let external: Arc<dyn ExternalSystem> = Arc::new(RestExternalSystem::new(ExternalClient::new(
        &config.external_system_url,
    )));

    let updater = Updater::new(&config, cloud, external, subtree_root_id);
    let cancel = CancellationToken::new();
    let _tasks = updater.start(cancel.clone()).await;
    tracing::info!("sync loops running");

    wait_for_shutdown().await?;
    tracing::info!("shutdown signal received");
    cancel.cancel();
    Ok(())
}

async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
