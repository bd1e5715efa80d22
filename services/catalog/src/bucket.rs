use crate::config::StorageConfig;
use crate::listing::{BucketLister, ListRequest, ListingError, ListingPage};
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};
use aws_sdk_s3::Client as S3Client;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Errors fetching an object body
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GetObject request failed: {0}")]
    Request(String),

    #[error("Failed to read object body: {0}")]
    Body(String),

    #[error("Object fetch cancelled")]
    Cancelled,

    #[error("Timed out fetching image data after {0:?}")]
    TimedOut(Duration),
}

/// Storage get-object API
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Buffer the whole object, giving up once `cancel` fires
    async fn get_object(&self, key: &str, cancel: CancellationToken) -> Result<Bytes, FetchError>;
}

/// S3-compatible bucket client used for listing and object reads
pub struct S3Bucket {
    client: S3Client,
    bucket: String,
}

impl S3Bucket {
    /// Create a new bucket client
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for R2/MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            s3_config_builder = s3_config_builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "gallery-config",
            ));
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 bucket client initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BucketLister for S3Bucket {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_page(&self, request: ListRequest) -> Result<ListingPage, ListingError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&request.prefix)
            .max_keys(request.limit)
            .set_continuation_token(request.marker)
            .send()
            .await
            .map_err(|e| match e.raw_response().map(|r| r.status().as_u16()) {
                Some(status) => ListingError::Status {
                    status,
                    message: e.to_string(),
                },
                None => ListingError::Request(e.to_string()),
            })?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(String::from))
            .collect();

        Ok(ListingPage {
            keys,
            marker: response.next_continuation_token().map(String::from),
        })
    }
}

#[async_trait]
impl ObjectFetcher for S3Bucket {
    #[instrument(skip(self, cancel), fields(bucket = %self.bucket))]
    async fn get_object(&self, key: &str, cancel: CancellationToken) -> Result<Bytes, FetchError> {
        let request = self.client.get_object().bucket(&self.bucket).key(key).send();

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            output = request => output.map_err(|e| FetchError::Request(e.to_string()))?,
        };

        let mut body = output.body;
        let mut buffer = BytesMut::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                chunk = body.try_next() => chunk.map_err(|e| FetchError::Body(e.to_string()))?,
            };

            match chunk {
                Some(chunk) => buffer.extend_from_slice(&chunk),
                None => break,
            }
        }

        debug!(key = %key, size_bytes = buffer.len(), "Object fetched");
        Ok(buffer.freeze())
    }
}
