#![allow(dead_code)] // Shared by both suites; not every helper is used in each.

//! Test doubles and fixtures for the upload coordinator suites.
//!
//! The stores mirror the guarded-transition semantics in memory: every
//! conditional operation runs under one lock, so the guard and the mutation
//! are evaluated together exactly like the database row lock does it.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use lodgia_core::models::{LodgingImage, PendingUpload, ProfileImage};
use lodgia_core::{AppError, ImageUploadSettings};
use lodgia_db::{
    LodgingMedia, LodgingMediaStore, OwnerScope, UserProfileMedia, UserProfileStore,
};
use lodgia_processing::WebpNormalizer;
use lodgia_services::{LodgingImagesService, UserProfileImagesService};
use lodgia_storage::{MemoryObjectStorage, PassthroughUrlBuilder};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn test_settings() -> ImageUploadSettings {
    ImageUploadSettings {
        pending_ttl_seconds: 1800,
        max_bytes: 10 * 1024 * 1024,
        max_width: 256,
        max_height: 256,
        allowed_mimes: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ],
        webp_quality: 80.0,
    }
}

/// A small valid PNG to stand in for client uploads.
pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let img = image_buffer(width, height);
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buffer)
}

fn image_buffer(width: u32, height: u32) -> image::RgbaImage {
    let mut img = image::RgbaImage::new(width, height);
    for pixel in img.pixels_mut() {
        *pixel = image::Rgba([20, 90, 160, 255]);
    }
    img
}

pub fn sample_image(is_default: bool) -> LodgingImage {
    let image_id = Uuid::new_v4();
    LodgingImage {
        image_id,
        key: format!("lodgings/seed/{}/original.webp", image_id),
        is_default,
        width: Some(640),
        height: Some(480),
        bytes: Some(10_000),
        mime: Some("image/webp".to_string()),
        created_at: Utc::now(),
    }
}

pub fn pending_entry(image_id: Uuid, staging_key: &str, ttl_seconds: i64) -> PendingUpload {
    let now = Utc::now();
    PendingUpload {
        image_id,
        staging_key: staging_key.to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(ttl_seconds),
    }
}

// ----- Lodging store double -----

struct LodgingDoc {
    owner_id: Uuid,
    media: LodgingMedia,
}

#[derive(Default)]
pub struct MemoryLodgingStore {
    docs: Mutex<HashMap<Uuid, LodgingDoc>>,
}

impl MemoryLodgingStore {
    pub fn insert_lodging(&self, lodging_id: Uuid, owner_id: Uuid) {
        self.docs.lock().unwrap().insert(
            lodging_id,
            LodgingDoc {
                owner_id,
                media: LodgingMedia::default(),
            },
        );
    }

    pub fn seed_images(&self, lodging_id: Uuid, images: Vec<LodgingImage>) {
        let mut docs = self.docs.lock().unwrap();
        docs.get_mut(&lodging_id).expect("lodging").media.images = images;
    }

    pub fn seed_pending(&self, lodging_id: Uuid, pending: PendingUpload) {
        let mut docs = self.docs.lock().unwrap();
        docs.get_mut(&lodging_id)
            .expect("lodging")
            .media
            .pending_uploads
            .push(pending);
    }

    pub fn media(&self, lodging_id: Uuid) -> LodgingMedia {
        self.docs
            .lock()
            .unwrap()
            .get(&lodging_id)
            .expect("lodging")
            .media
            .clone()
    }
}

fn in_scope(owner_id: Uuid, scope: OwnerScope) -> bool {
    match scope {
        OwnerScope::Any => true,
        OwnerScope::Owner(id) => owner_id == id,
    }
}

#[async_trait]
impl LodgingMediaStore for MemoryLodgingStore {
    async fn find_media(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<LodgingMedia>, AppError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .get(&lodging_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
            .map(|doc| doc.media.clone()))
    }

    async fn try_reserve_slot(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
        max_images: usize,
    ) -> Result<bool, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs
            .get_mut(&lodging_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
        else {
            return Ok(false);
        };
        if doc.media.images.len() + doc.media.pending_uploads.len() >= max_images {
            return Ok(false);
        }
        doc.media.pending_uploads.push(pending);
        Ok(true)
    }

    async fn try_promote_image(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        image: LodgingImage,
        max_images: usize,
    ) -> Result<Option<LodgingMedia>, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs
            .get_mut(&lodging_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
        else {
            return Ok(None);
        };

        let pending_exists = doc
            .media
            .pending_uploads
            .iter()
            .any(|entry| entry.image_id == image.image_id);
        let image_exists = doc
            .media
            .images
            .iter()
            .any(|entry| entry.image_id == image.image_id);
        if !pending_exists || image_exists || doc.media.images.len() >= max_images {
            return Ok(None);
        }

        doc.media
            .pending_uploads
            .retain(|entry| entry.image_id != image.image_id);
        doc.media.images.push(image);
        Ok(Some(doc.media.clone()))
    }

    async fn replace_images(
        &self,
        lodging_id: Uuid,
        images: Vec<LodgingImage>,
    ) -> Result<(), AppError> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .get_mut(&lodging_id)
            .ok_or_else(|| AppError::NotFound("Lodging not found".to_string()))?;
        doc.media.images = images;
        Ok(())
    }
}

// ----- Profile store double -----

struct UserDoc {
    owner_id: Uuid,
    media: UserProfileMedia,
    avatar_url: Option<String>,
}

#[derive(Default)]
pub struct MemoryProfileStore {
    docs: Mutex<HashMap<Uuid, UserDoc>>,
}

impl MemoryProfileStore {
    pub fn insert_user(&self, user_id: Uuid, owner_id: Uuid) {
        self.docs.lock().unwrap().insert(
            user_id,
            UserDoc {
                owner_id,
                media: UserProfileMedia::default(),
                avatar_url: None,
            },
        );
    }

    pub fn seed_pending(&self, user_id: Uuid, pending: PendingUpload) {
        let mut docs = self.docs.lock().unwrap();
        docs.get_mut(&user_id)
            .expect("user")
            .media
            .pending_uploads
            .push(pending);
    }

    pub fn media(&self, user_id: Uuid) -> UserProfileMedia {
        self.docs
            .lock()
            .unwrap()
            .get(&user_id)
            .expect("user")
            .media
            .clone()
    }

    pub fn avatar_url(&self, user_id: Uuid) -> Option<String> {
        self.docs
            .lock()
            .unwrap()
            .get(&user_id)
            .expect("user")
            .avatar_url
            .clone()
    }
}

#[async_trait]
impl UserProfileStore for MemoryProfileStore {
    async fn find_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<UserProfileMedia>, AppError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .get(&user_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
            .map(|doc| doc.media.clone()))
    }

    async fn add_pending(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
    ) -> Result<bool, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs
            .get_mut(&user_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
        else {
            return Ok(false);
        };
        doc.media.pending_uploads.push(pending);
        Ok(true)
    }

    async fn try_promote_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        image: ProfileImage,
        avatar_url: String,
    ) -> Result<Option<UserProfileMedia>, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs
            .get_mut(&user_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
        else {
            return Ok(None);
        };

        let pending_exists = doc
            .media
            .pending_uploads
            .iter()
            .any(|entry| entry.image_id == image.image_id);
        if !pending_exists {
            return Ok(None);
        }

        doc.media
            .pending_uploads
            .retain(|entry| entry.image_id != image.image_id);
        doc.media.profile_image = Some(image);
        doc.avatar_url = Some(avatar_url);
        Ok(Some(doc.media.clone()))
    }

    async fn clear_profile(&self, user_id: Uuid, scope: OwnerScope) -> Result<bool, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(doc) = docs
            .get_mut(&user_id)
            .filter(|doc| in_scope(doc.owner_id, scope))
        else {
            return Ok(false);
        };
        doc.media.profile_image = None;
        doc.avatar_url = None;
        Ok(true)
    }
}

// ----- Wired-up worlds -----

pub struct LodgingWorld {
    pub store: Arc<MemoryLodgingStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub service: LodgingImagesService,
    pub lodging_id: Uuid,
    pub owner_id: Uuid,
}

impl LodgingWorld {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: ImageUploadSettings) -> Self {
        let store = Arc::new(MemoryLodgingStore::default());
        let storage = Arc::new(MemoryObjectStorage::new(600));
        let service = LodgingImagesService::new(
            Arc::clone(&store) as Arc<dyn LodgingMediaStore>,
            Arc::clone(&storage) as Arc<dyn lodgia_storage::ObjectStorage>,
            Arc::new(WebpNormalizer),
            Arc::new(PassthroughUrlBuilder),
            settings,
        );

        let lodging_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        store.insert_lodging(lodging_id, owner_id);

        LodgingWorld {
            store,
            storage,
            service,
            lodging_id,
            owner_id,
        }
    }

    /// Stand in for the client PUT against the signed staging URL.
    pub async fn upload_staged(&self, staging_key: &str, data: Bytes, mime: &str) {
        self.storage.put_bytes(staging_key, data, mime).await;
    }
}

pub struct ProfileWorld {
    pub store: Arc<MemoryProfileStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub service: UserProfileImagesService,
    pub user_id: Uuid,
    pub owner_id: Uuid,
}

impl ProfileWorld {
    pub fn new() -> Self {
        let store = Arc::new(MemoryProfileStore::default());
        let storage = Arc::new(MemoryObjectStorage::new(600));
        let service = UserProfileImagesService::new(
            Arc::clone(&store) as Arc<dyn UserProfileStore>,
            Arc::clone(&storage) as Arc<dyn lodgia_storage::ObjectStorage>,
            Arc::new(WebpNormalizer),
            Arc::new(PassthroughUrlBuilder),
            test_settings(),
        );

        let user_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        store.insert_user(user_id, owner_id);

        ProfileWorld {
            store,
            storage,
            service,
            user_id,
            owner_id,
        }
    }

    pub async fn upload_staged(&self, staging_key: &str, data: Bytes, mime: &str) {
        self.storage.put_bytes(staging_key, data, mime).await;
    }
}

/// Let spawned fire-and-forget cleanup tasks run.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
