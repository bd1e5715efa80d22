use crate::exif::{ExifRecord, ExifService};
use crate::notifier::{Notification, Notifier};
use crate::urls::{GalleryImageEntry, ImageUrls};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use gallery_catalog::config::ApiConfig;
use gallery_catalog::Catalog;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub urls: Arc<ImageUrls>,
    pub exif: Arc<ExifService>,
    pub notifier: Arc<Notifier>,
}

/// Folder name to image URLs
pub type ImagesResponse = BTreeMap<String, Vec<GalleryImageEntry>>;

/// Public configuration exposed to the frontend
#[derive(Debug, Serialize)]
pub struct PublicConfigResponse {
    #[serde(rename = "IMAGE_BASE_URL")]
    pub image_base_url: String,
}

/// Broadcast result
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub delivered: usize,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    // Only the notification stream is opened to other origins
    let cors = CorsLayer::new().allow_origin(Any);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/images", get(list_images))
        .route("/exif/*key", get(get_exif))
        .route("/thumbnail/*key", get(get_thumbnail))
        .route("/config", get(public_config))
        .route(
            "/notifications",
            get(notification_stream).layer(cors).post(send_notification),
        );

    if let Some(ref static_dir) = config.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gallery-server",
        "images": state.catalog.image_count()
    }))
}

/// Every catalog image with its original and thumbnail URL
#[instrument(skip(state))]
async fn list_images(State(state): State<AppState>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    metrics::counter!("gallery_images_requests_total").increment(1);

    let images: ImagesResponse = state
        .catalog
        .folders()
        .map(|(folder, keys)| {
            let entries = keys.iter().map(|key| state.urls.entry(key)).collect();
            (folder.to_string(), entries)
        })
        .collect();

    let body = serde_json::to_value(&images).map_err(|e| {
        error!(error = %e, "Failed to build image list");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build image list".to_string(),
        )
    })?;

    info!(folders = images.len(), "Image list sent");
    Ok(Json(body))
}

/// EXIF metadata for a key or a full public URL
#[instrument(skip(state))]
async fn get_exif(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExifRecord>, (StatusCode, Json<ExifRecord>)> {
    let key = state.urls.normalize_key(&key).to_string();
    info!(key = %key, "EXIF requested");

    // A panic while reading or parsing is isolated to this request
    let exif = state.exif.clone();
    let task_key = key.clone();
    let record = tokio::spawn(async move { exif.record_for(&task_key).await })
        .await
        .map_err(|e| {
            error!(key = %key, error = %e, "EXIF task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExifRecord::failed(e.to_string())),
            )
        })?;

    Ok(Json(record))
}

/// Original and thumbnail URL of one key
#[instrument(skip(state))]
async fn get_thumbnail(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<GalleryImageEntry> {
    let key = state.urls.normalize_key(&key);
    Json(state.urls.entry(key))
}

/// Public configuration
async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    Json(PublicConfigResponse {
        image_base_url: state.urls.base_url().to_string(),
    })
}

/// Long-lived SSE stream of notifications
async fn notification_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.notifier.subscribe();
    let stream = subscription.map(|notification| Event::default().json_data(notification));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Broadcast a message to every connected client
#[instrument(skip(state))]
async fn send_notification(
    State(state): State<AppState>,
    Json(notification): Json<Notification>,
) -> Json<NotifyResponse> {
    let delivered = state.notifier.broadcast(&notification);
    Json(NotifyResponse { delivered })
}

/// Serve the gallery API until `shutdown` resolves
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting gallery API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}
