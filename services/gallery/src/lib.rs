//! Gallery Server
//!
//! HTTP API over the catalog snapshot produced by the catalog builder.
//! Serves folder listings with CDN thumbnail URLs, reads EXIF exposure data
//! from the bucket on demand and pushes notifications to connected clients
//! over server-sent events.
//!
//! ## Architecture
//!
//! ```text
//!   data.json                      S3 Bucket
//! ┌──────────────┐               ┌──────────────┐
//! │ Catalog      │               │ GetObject    │
//! └──────────────┘               └──────────────┘
//!        │ read once at start           ▲
//!        ▼                              │ timeout + cancel
//! ┌──────────────┐  /images      ┌──────────────┐
//! │ ImageUrls    │◀──────────────│              │
//! └──────────────┘  /thumbnail   │   Gallery    │  /exif
//! ┌──────────────┐               │   API        │────────▶ ExifService
//! │ Notifier     │◀──────────────│              │
//! └──────────────┘ /notifications└──────────────┘
//! ```

pub mod api;
pub mod exif;
pub mod notifier;
pub mod urls;

pub use api::{create_router, start_api_server, AppState};
pub use self::exif::{parse_exif, ExifParseError, ExifRecord, ExifService};
pub use notifier::{ClientId, Notification, Notifier, Subscription};
pub use urls::{GalleryImageEntry, ImageUrls};
