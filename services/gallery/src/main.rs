use anyhow::{Context, Result};
use gallery_catalog::logging::init_tracing;
use gallery_catalog::{Catalog, Config, S3Bucket};
use gallery_server::{start_api_server, AppState, ExifService, ImageUrls, Notifier};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate_gallery()
        .context("Invalid configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting gallery server"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // The snapshot is read once; rebuilding it needs a restart
    let catalog = Catalog::load(&config.catalog.snapshot_path).with_context(|| {
        format!(
            "Failed to load catalog snapshot from {}",
            config.catalog.snapshot_path.display()
        )
    })?;

    info!(
        folders = catalog.folder_count(),
        images = catalog.image_count(),
        "Catalog loaded"
    );

    let bucket = Arc::new(
        S3Bucket::new(&config.storage)
            .await
            .context("Failed to initialize S3 bucket client")?,
    );

    let state = AppState {
        catalog: Arc::new(catalog),
        urls: Arc::new(ImageUrls::from_config(&config.gallery)),
        exif: Arc::new(ExifService::new(bucket, config.exif_timeout())),
        notifier: Arc::new(Notifier::new()),
    };

    start_api_server(state, &config.api, shutdown_signal()).await?;

    info!("Gallery server stopped");

    Ok(())
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
