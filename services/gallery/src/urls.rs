use gallery_catalog::config::GalleryConfig;
use serde::{Deserialize, Serialize};

/// Public URLs of one gallery image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImageEntry {
    pub original: String,
    pub thumbnail: String,
}

/// Derives original and thumbnail URLs for object keys.
///
/// Thumbnails are produced by the CDN: the URL only carries an
/// `imageView2` directive, nothing is resized here.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base_url: String,
    width: u32,
    height: u32,
    quality: u8,
}

impl ImageUrls {
    pub fn new(base_url: impl Into<String>, width: u32, height: u32, quality: u8) -> Self {
        Self {
            base_url: base_url.into(),
            width,
            height,
            quality,
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(
            config.image_base_url.clone(),
            config.thumbnail_width,
            config.thumbnail_height,
            config.compression_quality,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn original_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    pub fn thumbnail_url(&self, key: &str) -> String {
        format!(
            "{}?imageView2/2/w/{}/h/{}/format/webp/q/{}",
            self.original_url(key),
            self.width,
            self.height,
            self.quality
        )
    }

    pub fn entry(&self, key: &str) -> GalleryImageEntry {
        GalleryImageEntry {
            original: self.original_url(key),
            thumbnail: self.thumbnail_url(key),
        }
    }

    /// Turn a public URL back into its object key; bare keys pass through
    pub fn normalize_key<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
    }
}
