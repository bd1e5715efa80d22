use anyhow::{Context, Result};
use gallery_catalog::logging::init_tracing;
use gallery_catalog::{Catalog, Config, ListingCursor, ListingSession, S3Bucket};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        bucket = %config.storage.bucket,
        prefix = %config.catalog.prefix,
        "Starting catalog build"
    );

    let bucket = S3Bucket::new(&config.storage)
        .await
        .context("Failed to initialize S3 bucket client")?;

    let cursor = ListingCursor::new(config.catalog.prefix.clone(), config.catalog.page_size);
    let keys = ListingSession::new(bucket, cursor).collect_all().await;

    let catalog = Catalog::group_by_folder(keys);
    catalog
        .persist(&config.catalog.snapshot_path)
        .with_context(|| {
            format!(
                "Failed to write snapshot to {}",
                config.catalog.snapshot_path.display()
            )
        })?;

    info!(
        path = %config.catalog.snapshot_path.display(),
        folders = catalog.folder_count(),
        images = catalog.image_count(),
        "Catalog build finished"
    );

    Ok(())
}
