//! Gallery Catalog
//!
//! Builds the image catalog for the gallery. The builder walks an
//! S3-compatible bucket under a prefix, keeps image keys, groups them by
//! folder and writes a JSON snapshot that the gallery server loads at start.
//!
//! ## Architecture
//!
//! ```text
//! S3 Bucket                 Catalog Builder               Snapshot
//! ┌──────────────┐         ┌──────────────────┐         ┌──────────────┐
//! │ {prefix}/    │ pages   │ ListingSession   │ group   │ data.json    │
//! │   {folder}/  │────────▶│   (cursor,       │────────▶│ {folder:     │
//! │     {image}  │         │    image filter) │         │   [keys]}    │
//! └──────────────┘         └──────────────────┘         └──────────────┘
//! ```
//!
//! The configuration, bucket client and key rules here are shared with the
//! gallery server.

pub mod bucket;
pub mod catalog;
pub mod config;
pub mod image_key;
pub mod listing;
pub mod logging;

pub use bucket::{FetchError, ObjectFetcher, S3Bucket};
pub use catalog::{Catalog, SnapshotError};
pub use self::config::{Config, ConfigError};
pub use image_key::{folder_for_key, is_image_key, is_jpeg_key, ROOT_FOLDER};
pub use listing::{BucketLister, ListRequest, ListingCursor, ListingError, ListingPage, ListingSession};
