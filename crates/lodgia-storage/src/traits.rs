//! Storage abstraction trait
//!
//! This module defines the `ObjectStorage` trait that all storage backends
//! must implement. The upload coordinators only ever talk to this trait, so
//! test doubles can stand in without any container machinery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lodgia_core::ByteStream;
use std::collections::HashMap;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for lodgia_core::AppError {
    fn from(err: StorageError) -> Self {
        lodgia_core::AppError::Storage(err.to_string())
    }
}

/// Parameters for issuing a signed PUT URL.
#[derive(Debug, Clone)]
pub struct SignedPutRequest {
    pub key: String,
    pub content_type: String,
    pub content_length: Option<i64>,
    /// Overrides the backend's default expiry when set.
    pub expires_in_seconds: Option<u64>,
}

/// A signed, time-limited upload URL plus the headers the client must send.
#[derive(Debug, Clone)]
pub struct SignedPutUrl {
    pub url: String,
    pub method: String,
    pub required_headers: HashMap<String, String>,
    pub expires_in_seconds: u64,
}

/// Result of probing an object. Missing objects are reported with
/// `exists: false`, never as an error.
#[derive(Debug, Clone, Default)]
pub struct HeadObject {
    pub exists: bool,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A readable object: chunked stream plus whatever metadata the backend
/// reported. Missing objects yield an empty stream.
pub struct ObjectStream {
    pub stream: ByteStream,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub etag: Option<String>,
}

/// Parameters for a streaming write.
pub struct PutObjectRequest {
    pub key: String,
    pub body: ByteStream,
    pub content_type: String,
    pub cache_control: Option<String>,
}

/// Storage gateway consumed by the upload coordinators.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Issue a signed, time-limited PUT URL for direct client uploads.
    async fn create_signed_put_url(&self, request: SignedPutRequest)
        -> StorageResult<SignedPutUrl>;

    /// Probe an object's existence and metadata.
    async fn head_object(&self, key: &str) -> StorageResult<HeadObject>;

    /// Open an object for streaming reads. Returns an empty stream when the
    /// object does not exist.
    async fn get_object_stream(&self, key: &str) -> StorageResult<ObjectStream>;

    /// Write an object from a stream.
    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}

/// Headers a client must send with a signed PUT: the exact content type the
/// URL was signed for, and the length when one was declared.
pub(crate) fn required_put_headers(
    content_type: &str,
    content_length: Option<i64>,
) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), content_type.to_string());
    if let Some(length) = content_length {
        headers.insert("Content-Length".to_string(), length.to_string());
    }
    headers
}
