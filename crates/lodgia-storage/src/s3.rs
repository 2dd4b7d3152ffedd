//! S3-compatible storage implementation (AWS S3, R2, MinIO, Spaces).

use crate::traits::{
    required_put_headers, HeadObject, ObjectStorage, ObjectStream, PutObjectRequest,
    SignedPutRequest, SignedPutUrl, StorageError, StorageResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// S3 storage gateway built on `object_store`. Credentials come from the
/// standard AWS environment variables.
#[derive(Clone)]
pub struct S3ObjectStorage {
    store: AmazonS3,
    bucket: String,
    default_signed_url_expires_seconds: u64,
}

impl S3ObjectStorage {
    /// Create a new S3ObjectStorage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, R2 account endpoints)
    /// * `default_signed_url_expires_seconds` - expiry used when a request
    ///   does not override it
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        default_signed_url_expires_seconds: u64,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3ObjectStorage {
            store,
            bucket,
            default_signed_url_expires_seconds,
        })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn create_signed_put_url(
        &self,
        request: SignedPutRequest,
    ) -> StorageResult<SignedPutUrl> {
        let expires_in_seconds = request
            .expires_in_seconds
            .unwrap_or(self.default_signed_url_expires_seconds);
        let location = Path::from(request.key.clone());

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(
                Method::PUT,
                &location,
                Duration::from_secs(expires_in_seconds),
            )
            .await;

        let url = url_result
            .map_err(|e| StorageError::SignFailed(e.to_string()))?
            .to_string();

        tracing::info!(
            bucket = %self.bucket,
            key = %request.key,
            expires_in_seconds = expires_in_seconds,
            "Generated signed PUT URL"
        );

        Ok(SignedPutUrl {
            url,
            method: "PUT".to_string(),
            required_headers: required_put_headers(
                &request.content_type,
                request.content_length,
            ),
            expires_in_seconds,
        })
    }

    async fn head_object(&self, key: &str) -> StorageResult<HeadObject> {
        let location = Path::from(key.to_string());
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        match self.store.get_opts(&location, options).await {
            Ok(result) => {
                let mime = result
                    .attributes
                    .get(&Attribute::ContentType)
                    .map(|value| value.to_string());
                Ok(HeadObject {
                    exists: true,
                    bytes: Some(result.meta.size as i64),
                    mime,
                    etag: result.meta.e_tag.clone(),
                    last_modified: Some(result.meta.last_modified),
                })
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(HeadObject::default()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_object_stream(&self, key: &str) -> StorageResult<ObjectStream> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        match self.store.get(&location).await {
            Ok(result) => {
                let bytes = Some(result.meta.size as i64);
                let etag = result.meta.e_tag.clone();
                let mime = result
                    .attributes
                    .get(&Attribute::ContentType)
                    .map(|value| value.to_string());

                let bucket = self.bucket.clone();
                let key_owned = key.to_string();
                let stream = result.into_stream().map(move |chunk| {
                    chunk.map_err(|e| {
                        tracing::error!(
                            bucket = %bucket,
                            key = %key_owned,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 stream download error"
                        );
                        std::io::Error::other(e.to_string())
                    })
                });

                Ok(ObjectStream {
                    stream: Box::pin(stream),
                    bytes,
                    mime,
                    etag,
                })
            }
            // Missing objects are an empty stream, never an error.
            Err(ObjectStoreError::NotFound { .. }) => Ok(ObjectStream {
                stream: Box::pin(futures::stream::empty()),
                bytes: None,
                mime: None,
                etag: None,
            }),
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()> {
        let PutObjectRequest {
            key,
            mut body,
            content_type,
            cache_control,
        } = request;
        let start = std::time::Instant::now();

        // Collect the transformed chunks into a single put. Normalized
        // images are bounded by the configured output dimensions, so a
        // multipart upload buys nothing here.
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut size: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
            })?;
            size += chunk.len() as u64;
            chunks.push(chunk);
        }

        let payload = PutPayload::from_iter(chunks);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.into());
        if let Some(cache) = cache_control {
            attributes.insert(Attribute::CacheControl, cache.into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let location = Path::from(key.clone());
        let result: ObjectResult<_> = self.store.put_opts(&location, payload, options).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }
}
