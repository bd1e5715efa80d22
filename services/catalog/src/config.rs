use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),
}

/// Configuration shared by the catalog builder and the gallery server
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Catalog listing and snapshot configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Gallery URL and EXIF configuration
    #[serde(default)]
    pub gallery: GalleryConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Object storage (S3-compatible) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding the images
    pub bucket: String,
    /// Storage region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (R2, MinIO, LocalStack, ...)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Static access key; the default provider chain is used when absent
    pub access_key_id: Option<String>,
    /// Static secret key
    pub secret_access_key: Option<String>,
}

/// Catalog listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Key prefix (image directory) to list under
    #[serde(default)]
    pub prefix: String,
    /// Maximum number of keys requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    /// Where the catalog snapshot is written and read
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

/// Gallery URL and EXIF configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    /// Public base URL of the bucket, without trailing slash
    #[serde(default)]
    pub image_base_url: String,
    /// Thumbnail compression quality (1-100)
    #[serde(default = "default_compression_quality")]
    pub compression_quality: u8,
    /// Thumbnail bounding box width
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
    /// Thumbnail bounding box height
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
    /// Upper bound on fetching an object for EXIF extraction
    #[serde(default = "default_exif_timeout_secs")]
    pub exif_timeout_secs: u64,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Directory of static frontend files served as fallback
    pub static_dir: Option<PathBuf>,
}

// Default value functions
fn default_service_name() -> String {
    "gallery".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_page_size() -> i32 {
    1000
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_compression_quality() -> u8 {
    75
}

fn default_thumbnail_width() -> u32 {
    200
}

fn default_thumbnail_height() -> u32 {
    400
}

fn default_exif_timeout_secs() -> u64 {
    5
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from `.env`, config files and environment
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is not an error
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/gallery").required(false))
            .add_source(config::File::with_name("/etc/gallery/gallery").required(false))
            // GALLERY__STORAGE__BUCKET -> storage.bucket
            .add_source(
                config::Environment::with_prefix("GALLERY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate the settings every binary needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::MissingRequired("storage.bucket".to_string()));
        }

        if self.catalog.page_size <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "catalog.page_size".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if self.storage.access_key_id.is_some() != self.storage.secret_access_key.is_some() {
            return Err(ConfigError::InvalidValue {
                key: "storage.access_key_id".to_string(),
                message: "access key and secret key must be set together".to_string(),
            });
        }

        Ok(())
    }

    /// Validate the settings the gallery server additionally needs
    pub fn validate_gallery(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let gallery = &self.gallery;
        if gallery.image_base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "gallery.image_base_url".to_string(),
            ));
        }

        if !(1..=100).contains(&gallery.compression_quality) {
            return Err(ConfigError::InvalidValue {
                key: "gallery.compression_quality".to_string(),
                message: format!("{} is outside 1-100", gallery.compression_quality),
            });
        }

        if gallery.thumbnail_width == 0 || gallery.thumbnail_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "gallery.thumbnail_width".to_string(),
                message: "thumbnail dimensions must be non-zero".to_string(),
            });
        }

        if gallery.exif_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "gallery.exif_timeout_secs".to_string(),
                message: "must be at least one second".to_string(),
            });
        }

        Ok(())
    }

    /// Get the EXIF fetch timeout as Duration
    pub fn exif_timeout(&self) -> Duration {
        Duration::from_secs(self.gallery.exif_timeout_secs)
    }

    /// Address the HTTP API binds to
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            page_size: default_page_size(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            image_base_url: String::new(),
            compression_quality: default_compression_quality(),
            thumbnail_width: default_thumbnail_width(),
            thumbnail_height: default_thumbnail_height(),
            exif_timeout_secs: default_exif_timeout_secs(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            static_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            service: ServiceConfig::default(),
            storage: StorageConfig {
                bucket: "photos".to_string(),
                region: "auto".to_string(),
                endpoint_url: Some("https://r2.example.test".to_string()),
                force_path_style: false,
                access_key_id: None,
                secret_access_key: None,
            },
            catalog: CatalogConfig::default(),
            gallery: GalleryConfig {
                image_base_url: "http://cdn.test".to_string(),
                ..GalleryConfig::default()
            },
            api: ApiConfig::default(),
        }
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_page_size(), 1000);
        assert_eq!(default_thumbnail_width(), 200);
        assert_eq!(default_thumbnail_height(), 400);
        assert_eq!(default_exif_timeout_secs(), 5);
        assert_eq!(default_snapshot_path(), PathBuf::from("data.json"));
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(config.validate().is_ok());
        assert!(config.validate_gallery().is_ok());
        assert_eq!(config.exif_timeout(), Duration::from_secs(5));
        assert_eq!(config.api_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_bucket() {
        let mut config = create_test_config();
        config.storage.bucket = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_builder_does_not_need_base_url() {
        let mut config = create_test_config();
        config.gallery.image_base_url = String::new();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_gallery(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_quality_out_of_range() {
        let mut config = create_test_config();
        config.gallery.compression_quality = 0;
        assert!(matches!(
            config.validate_gallery(),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.gallery.compression_quality = 101;
        assert!(config.validate_gallery().is_err());
    }

    #[test]
    fn test_half_configured_credentials() {
        let mut config = create_test_config();
        config.storage.access_key_id = Some("key".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deserialize_with_section_defaults() {
        let config: Config = config::Config::builder()
            .set_override("storage.bucket", "photos")
            .unwrap()
            .set_override("gallery.image_base_url", "http://cdn.test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storage.region, "auto");
        assert_eq!(config.catalog.page_size, 1000);
        assert_eq!(config.gallery.compression_quality, 75);
        assert_eq!(config.api.port, 3000);
        assert!(config.api.static_dir.is_none());
    }
}
