//! On-demand EXIF extraction.
//!
//! Objects are fetched whole, under a timeout, and only JPEGs are handed to
//! the tag parser. Fetch failures surface as an `error` string on an
//! otherwise empty record; parse failures yield an empty record silently.

use bytes::Bytes;
use exif::{In, Reader, Tag, Value};
use gallery_catalog::{is_jpeg_key, FetchError, ObjectFetcher};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

#[derive(Error, Debug)]
#[error("Failed to parse EXIF data: {0}")]
pub struct ExifParseError(#[from] exif::Error);

/// Exposure metadata returned by `/exif`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifRecord {
    #[serde(rename = "FNumber")]
    pub f_number: Option<f64>,
    #[serde(rename = "ExposureTime")]
    pub exposure_time: Option<f64>,
    #[serde(rename = "ISO")]
    pub iso: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExifRecord {
    /// Record with every field null
    pub fn empty() -> Self {
        Self::default()
    }

    /// Empty record carrying an error message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn rational(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }
}

/// Parse FNumber, ExposureTime and ISO out of a JPEG buffer.
///
/// Zero or non-finite values are reported as missing.
pub fn parse_exif(data: &[u8]) -> Result<ExifRecord, ExifParseError> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(data))?;

    let positive = |v: f64| v.is_finite() && v != 0.0;

    let f_number = exif
        .get_field(Tag::FNumber, In::PRIMARY)
        .and_then(|f| rational(&f.value))
        .filter(|v| positive(*v))
        .map(|v| round_to(v, 1));

    let exposure_time = exif
        .get_field(Tag::ExposureTime, In::PRIMARY)
        .and_then(|f| rational(&f.value))
        .filter(|v| positive(*v))
        .map(|v| round_to(v, 4));

    let iso = exif
        .get_field(Tag::PhotographicSensitivity, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .filter(|v| *v != 0);

    Ok(ExifRecord {
        f_number,
        exposure_time,
        iso,
        error: None,
    })
}

/// Fetches objects and extracts their exposure metadata
pub struct ExifService {
    fetcher: Arc<dyn ObjectFetcher>,
    fetch_timeout: Duration,
}

impl ExifService {
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            fetch_timeout,
        }
    }

    /// Fetch the object, cancelling the read if it outlives the timeout
    async fn fetch(&self, key: &str) -> Result<Bytes, FetchError> {
        let cancel = CancellationToken::new();
        let fetch = self.fetcher.get_object(key, cancel.clone());

        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(FetchError::TimedOut(self.fetch_timeout))
            }
        }
    }

    /// Build the EXIF record for a bare object key
    #[instrument(skip(self))]
    pub async fn record_for(&self, key: &str) -> ExifRecord {
        let data = match self.fetch(key).await {
            Ok(data) => data,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to fetch image for EXIF");
                metrics::counter!("gallery_exif_requests_total", "outcome" => "fetch_failed")
                    .increment(1);
                return ExifRecord::failed(e.to_string());
            }
        };

        if !is_jpeg_key(key) {
            debug!(key = %key, "Image format does not carry EXIF");
            metrics::counter!("gallery_exif_requests_total", "outcome" => "unsupported")
                .increment(1);
            return ExifRecord::empty();
        }

        match parse_exif(&data) {
            Ok(record) => {
                metrics::counter!("gallery_exif_requests_total", "outcome" => "ok").increment(1);
                record
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Could not parse EXIF data");
                metrics::counter!("gallery_exif_requests_total", "outcome" => "parse_failed")
                    .increment(1);
                ExifRecord::empty()
            }
        }
    }
}
