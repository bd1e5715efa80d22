//! Paginated bucket listing.
//!
//! A [`ListingSession`] walks a prefix page by page through a
//! [`BucketLister`], keeping only image keys. Listing failures are
//! soft: the session converts them into an empty page, which ends the walk
//! and leaves the catalog truncated.

use crate::image_key::is_image_key;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors from a single listing request
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Listing request failed: {0}")]
    Request(String),

    #[error("Listing returned status {status}: {message}")]
    Status { status: u16, message: String },
}

/// One page request against the listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    pub limit: i32,
    /// Continuation marker; `None` starts from the beginning
    pub marker: Option<String>,
}

/// Raw page returned by the listing API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    /// Marker for the next page; `None` or empty means no more results
    pub marker: Option<String>,
}

/// Storage listing API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketLister: Send + Sync {
    async fn list_page(&self, request: ListRequest) -> Result<ListingPage, ListingError>;
}

/// Pagination state for one listing session
#[derive(Debug, Clone)]
pub struct ListingCursor {
    limit: i32,
    prefix: String,
    marker: String,
    first_call: bool,
}

impl ListingCursor {
    pub fn new(prefix: impl Into<String>, limit: i32) -> Self {
        Self {
            limit,
            prefix: prefix.into(),
            marker: String::new(),
            first_call: true,
        }
    }

    /// No marker left after at least one call
    pub fn is_exhausted(&self) -> bool {
        !self.first_call && self.marker.is_empty()
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn request(&self) -> ListRequest {
        ListRequest {
            prefix: self.prefix.clone(),
            limit: self.limit,
            marker: (!self.marker.is_empty()).then(|| self.marker.clone()),
        }
    }
}

/// Walks every page under the cursor's prefix
pub struct ListingSession<L> {
    lister: L,
    cursor: ListingCursor,
}

impl<L: BucketLister> ListingSession<L> {
    pub fn new(lister: L, cursor: ListingCursor) -> Self {
        Self { lister, cursor }
    }

    pub fn cursor(&self) -> &ListingCursor {
        &self.cursor
    }

    /// Fetch the next page and keep only image keys
    pub async fn try_next_page(&mut self) -> Result<Vec<String>, ListingError> {
        if self.cursor.is_exhausted() {
            return Ok(Vec::new());
        }
        self.cursor.first_call = false;

        let page = self.lister.list_page(self.cursor.request()).await?;
        self.cursor.marker = page.marker.unwrap_or_default();

        let listed = page.keys.len();
        let keys: Vec<String> = page.keys.into_iter().filter(|k| is_image_key(k)).collect();

        debug!(
            listed = listed,
            images = keys.len(),
            has_more = !self.cursor.marker.is_empty(),
            "Listing page received"
        );

        Ok(keys)
    }

    /// Like [`Self::try_next_page`], but a failed page becomes an empty one
    pub async fn next_page(&mut self) -> Vec<String> {
        match self.try_next_page().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Listing page failed, treating as end of listing");
                Vec::new()
            }
        }
    }

    /// Accumulate pages until one comes back empty
    #[instrument(skip(self), fields(prefix = %self.cursor.prefix))]
    pub async fn collect_all(&mut self) -> Vec<String> {
        info!("Listing started");

        let mut keys = Vec::new();
        loop {
            let page = self.next_page().await;
            if page.is_empty() {
                break;
            }
            keys.extend(page);
        }

        info!(total = keys.len(), "Listing finished");
        keys
    }
}
