//! Storage and URL-builder construction from configuration.

use crate::memory::MemoryObjectStorage;
use crate::s3::S3ObjectStorage;
use crate::traits::{ObjectStorage, StorageError, StorageResult};
use crate::urls::{CdnUrlBuilder, MediaUrlBuilder, PassthroughUrlBuilder};
use lodgia_core::config::{Config, StorageBackend};
use std::sync::Arc;

/// Build the configured storage backend.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn ObjectStorage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET is required".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .unwrap_or_else(|| "auto".to_string());
            let storage = S3ObjectStorage::new(
                bucket,
                region,
                config.s3_endpoint.clone(),
                config.signed_url_expires_seconds,
            )?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage backend; objects do not survive restarts");
            Ok(Arc::new(MemoryObjectStorage::new(
                config.signed_url_expires_seconds,
            )))
        }
    }
}

/// Build the URL builder: CDN when a public base URL is configured,
/// passthrough otherwise.
pub fn create_url_builder(config: &Config) -> Arc<dyn MediaUrlBuilder> {
    match config.media_public_base_url.as_deref() {
        Some(base_url) => Arc::new(CdnUrlBuilder::new(base_url)),
        None => Arc::new(PassthroughUrlBuilder),
    }
}
