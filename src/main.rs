use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::{fs, net::TcpListener};

mod config;
mod errors;
mod handlers;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use services::{
    admission::AdmissionGate,
    backup::{DisabledBackup, MirrorBackup},
    content_source::HttpContentSource,
    local_store::LocalStore,
    media_store::MediaStore,
    replication::{ReplicationConfig, Replicator},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    logging::init(cfg.debug, cfg.log_dir.as_deref())?;
    tracing::info!("Starting media-catcher with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    fs::create_dir_all(&cfg.storage_dir)
        .await
        .with_context(|| format!("creating storage directory {}", cfg.storage_dir.display()))?;

    // --- Backup replication (optional) ---
    let replicator = match &cfg.backup {
        Some(backup) => {
            Replicator::start(
                Arc::new(MirrorBackup::new(&backup.dir)),
                backup.replication(),
            )
            .await
        }
        None => Replicator::start(Arc::new(DisabledBackup), ReplicationConfig::default()).await,
    };

    // --- Initialize core service ---
    let mut media = MediaStore::new(LocalStore::new(&cfg.storage_dir), replicator);
    if let Some(content) = &cfg.content {
        media = media.with_content_source(Arc::new(HttpContentSource::new(
            content.base_url.clone(),
            content.token.clone(),
        )));
        tracing::info!("Content source configured at {}", content.base_url);
    }

    let gate = AdmissionGate::new(cfg.rate_limit, cfg.rate_interval);
    let app_state = state::AppState::new(media.clone(), gate);

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(app_state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Drain background work before exiting ---
    media.wait_for_all().await;
    let stats = media.stats();
    tracing::info!(
        images = stats.image_count,
        videos = stats.video_count,
        audio = stats.audio_count,
        files = stats.file_count,
        bytes = stats.total_bytes,
        "Shutdown complete"
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining pending work");
}
