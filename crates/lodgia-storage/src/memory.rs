//! In-memory storage implementation for development and tests.

use crate::traits::{
    required_put_headers, HeadObject, ObjectStorage, ObjectStream, PutObjectRequest,
    SignedPutRequest, SignedPutUrl, StorageError, StorageResult,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    mime: String,
    etag: String,
    last_modified: chrono::DateTime<Utc>,
}

/// Keeps whole objects in a map. Signed URLs are fabricated (`memory://`)
/// since nothing ever dereferences them in this backend.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    default_signed_url_expires_seconds: u64,
}

impl MemoryObjectStorage {
    pub fn new(default_signed_url_expires_seconds: u64) -> Self {
        MemoryObjectStorage {
            objects: Arc::new(RwLock::new(HashMap::new())),
            default_signed_url_expires_seconds,
        }
    }

    /// Seed an object directly, standing in for a client PUT against the
    /// signed URL.
    pub async fn put_bytes(&self, key: &str, data: Bytes, mime: &str) {
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                mime: mime.to_string(),
                etag: format!("\"{}\"", Uuid::new_v4().simple()),
                last_modified: Utc::now(),
            },
        );
    }

    /// Read an object back out, for assertions.
    pub async fn get_bytes(&self, key: &str) -> Option<Bytes> {
        let objects = self.objects.read().await;
        objects.get(key).map(|object| object.data.clone())
    }

    pub async fn contains(&self, key: &str) -> bool {
        let objects = self.objects.read().await;
        objects.contains_key(key)
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn create_signed_put_url(
        &self,
        request: SignedPutRequest,
    ) -> StorageResult<SignedPutUrl> {
        let expires_in_seconds = request
            .expires_in_seconds
            .unwrap_or(self.default_signed_url_expires_seconds);
        Ok(SignedPutUrl {
            url: format!("memory://{}?sig={}", request.key, Uuid::new_v4().simple()),
            method: "PUT".to_string(),
            required_headers: required_put_headers(
                &request.content_type,
                request.content_length,
            ),
            expires_in_seconds,
        })
    }

    async fn head_object(&self, key: &str) -> StorageResult<HeadObject> {
        let objects = self.objects.read().await;
        Ok(match objects.get(key) {
            Some(object) => HeadObject {
                exists: true,
                bytes: Some(object.data.len() as i64),
                mime: Some(object.mime.clone()),
                etag: Some(object.etag.clone()),
                last_modified: Some(object.last_modified),
            },
            None => HeadObject::default(),
        })
    }

    async fn get_object_stream(&self, key: &str) -> StorageResult<ObjectStream> {
        let objects = self.objects.read().await;
        Ok(match objects.get(key) {
            Some(object) => ObjectStream {
                stream: Box::pin(futures::stream::once({
                    let data = object.data.clone();
                    async move { Ok(data) }
                })),
                bytes: Some(object.data.len() as i64),
                mime: Some(object.mime.clone()),
                etag: Some(object.etag.clone()),
            },
            None => ObjectStream {
                stream: Box::pin(futures::stream::empty()),
                bytes: None,
                mime: None,
                etag: None,
            },
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> StorageResult<()> {
        let PutObjectRequest {
            key,
            mut body,
            content_type,
            cache_control: _,
        } = request;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
            })?;
            buffer.extend_from_slice(&chunk);
        }

        self.put_bytes(&key, buffer.freeze(), &content_type).await;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_head_reports_missing_without_error() {
        let storage = MemoryObjectStorage::new(600);
        let head = storage.head_object("nope").await.expect("head");
        assert!(!head.exists);
        assert!(head.bytes.is_none());
    }

    #[tokio::test]
    async fn test_put_then_head_then_stream_round_trip() {
        let storage = MemoryObjectStorage::new(600);
        storage
            .put_object(PutObjectRequest {
                key: "a/b".to_string(),
                body: Box::pin(futures::stream::iter(vec![
                    Ok(Bytes::from_static(b"hello ")),
                    Ok(Bytes::from_static(b"world")),
                ])),
                content_type: "text/plain".to_string(),
                cache_control: None,
            })
            .await
            .expect("put");

        let head = storage.head_object("a/b").await.expect("head");
        assert!(head.exists);
        assert_eq!(head.bytes, Some(11));
        assert_eq!(head.mime.as_deref(), Some("text/plain"));

        let object = storage.get_object_stream("a/b").await.expect("get");
        let chunks: Vec<Bytes> = object.stream.try_collect().await.expect("collect");
        let data: Vec<u8> = chunks.concat();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_missing_object_streams_empty() {
        let storage = MemoryObjectStorage::new(600);
        let object = storage.get_object_stream("absent").await.expect("get");
        let chunks: Vec<Bytes> = object.stream.try_collect().await.expect("collect");
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_an_error() {
        let storage = MemoryObjectStorage::new(600);
        assert!(storage.delete_object("absent").await.is_ok());
    }

    #[tokio::test]
    async fn test_signed_url_carries_required_headers() {
        let storage = MemoryObjectStorage::new(600);
        let signed = storage
            .create_signed_put_url(SignedPutRequest {
                key: "k".to_string(),
                content_type: "image/png".to_string(),
                content_length: Some(42),
                expires_in_seconds: None,
            })
            .await
            .expect("sign");
        assert_eq!(signed.method, "PUT");
        assert_eq!(signed.expires_in_seconds, 600);
        assert_eq!(
            signed.required_headers.get("Content-Type").map(String::as_str),
            Some("image/png")
        );
        assert_eq!(
            signed.required_headers.get("Content-Length").map(String::as_str),
            Some("42")
        );
    }
}
