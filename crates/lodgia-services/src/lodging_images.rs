//! Lodging image upload coordinator.
//!
//! Orchestrates the two-phase protocol for lodging photos: reserve a
//! capacity-guarded slot, hand the client a signed PUT URL, then on
//! confirmation validate the staged object, normalize it into its final
//! location, and atomically promote it to a persisted image while retiring
//! the reservation. Lost races that already reached the desired terminal
//! state are replayed as idempotent success.

use crate::content;
use crate::{spawn_delete_object, IMMUTABLE_CACHE_CONTROL};
use chrono::{Duration, Utc};
use lodgia_core::models::{
    ConfirmImageRequest, ConfirmLodgingImageResponse, DeleteLodgingImageResponse,
    ImageUploadUrlResponse, LodgingImage, LodgingImageResponse, PendingUpload,
    RequestImageUploadUrl, SetDefaultLodgingImageResponse, UserRole,
};
use lodgia_core::policy::ImagePolicy;
use lodgia_core::{AppError, ImageUploadSettings};
use lodgia_db::{LodgingMedia, LodgingMediaStore, OwnerScope};
use lodgia_processing::{ImageNormalizer, NormalizeOptions, WEBP_MIME};
use lodgia_storage::keys;
use lodgia_storage::{
    MediaUrlBuilder, ObjectStorage, PutObjectRequest, SignedPutRequest,
};
use std::sync::Arc;
use uuid::Uuid;

/// Metadata of the object that will be persisted, either reported by the
/// normalizer or reused from an already-materialized final object.
struct ProcessedImage {
    width: Option<u32>,
    height: Option<u32>,
    bytes: Option<i64>,
    mime: Option<String>,
}

pub struct LodgingImagesService {
    store: Arc<dyn LodgingMediaStore>,
    storage: Arc<dyn ObjectStorage>,
    normalizer: Arc<dyn ImageNormalizer>,
    urls: Arc<dyn MediaUrlBuilder>,
    policy: ImagePolicy,
    settings: ImageUploadSettings,
}

impl LodgingImagesService {
    pub fn new(
        store: Arc<dyn LodgingMediaStore>,
        storage: Arc<dyn ObjectStorage>,
        normalizer: Arc<dyn ImageNormalizer>,
        urls: Arc<dyn MediaUrlBuilder>,
        settings: ImageUploadSettings,
    ) -> Self {
        Self {
            store,
            storage,
            normalizer,
            urls,
            policy: ImagePolicy::LODGING,
            settings,
        }
    }

    /// Reserve an upload slot and issue a signed PUT URL for it.
    #[tracing::instrument(
        skip(self, request),
        fields(lodging_id = %lodging_id, requester_id = %requester_id)
    )]
    pub async fn create_upload_url(
        &self,
        lodging_id: Uuid,
        request: &RequestImageUploadUrl,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<ImageUploadUrlResponse, AppError> {
        content::assert_allowed_mime(&self.settings.allowed_mimes, request.mime.as_deref())?;
        content::assert_size_within_limit(request.size, self.settings.max_bytes)?;

        let scope = OwnerScope::for_role(role, requester_id);
        self.find_owned_media(lodging_id, scope).await?;

        let image_id = Uuid::new_v4();
        let staging_key = keys::lodging_staging_key(lodging_id, image_id);
        let now = Utc::now();
        let pending = PendingUpload {
            image_id,
            staging_key: staging_key.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(self.settings.pending_ttl_seconds),
        };

        let applied = self
            .store
            .try_reserve_slot(lodging_id, scope, pending, self.policy.max_images)
            .await?;

        if !applied {
            // The guarded append matched nothing. Re-read and classify: an
            // accurate LIMIT_EXCEEDED beats a generic conflict.
            let current = self.find_owned_media(lodging_id, scope).await?;
            self.policy.assert_can_reserve_slot(
                current.images.len(),
                current.pending_uploads.len(),
            )?;
            return Err(AppError::StateConflict(
                "Could not reserve an image slot".to_string(),
            ));
        }

        let content_type = request
            .mime
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let signed = self
            .storage
            .create_signed_put_url(SignedPutRequest {
                key: staging_key.clone(),
                content_type,
                content_length: request.size,
                expires_in_seconds: None,
            })
            .await?;

        tracing::info!(
            image_id = %image_id,
            staging_key = %staging_key,
            "Reserved lodging image slot"
        );

        Ok(ImageUploadUrlResponse {
            image_id,
            upload_key: staging_key,
            upload_url: signed.url,
            method: signed.method,
            required_headers: signed.required_headers,
            expires_in_seconds: signed.expires_in_seconds,
        })
    }

    /// Confirm an upload: validate the reservation and the staged object,
    /// normalize into the final location (unless a retried confirmation
    /// already materialized it), and promote atomically.
    #[tracing::instrument(
        skip(self, request),
        fields(lodging_id = %lodging_id, image_id = %request.image_id)
    )]
    pub async fn confirm_upload(
        &self,
        lodging_id: Uuid,
        request: &ConfirmImageRequest,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<ConfirmLodgingImageResponse, AppError> {
        let scope = OwnerScope::for_role(role, requester_id);
        let media = self.find_owned_media(lodging_id, scope).await?;

        // Idempotence short-circuit: a confirmed image wins over everything,
        // even if the reservation is long gone.
        if let Some(existing) = media
            .images
            .iter()
            .find(|image| image.image_id == request.image_id)
        {
            return Ok(ConfirmLodgingImageResponse {
                image: self.to_image_response(existing),
                idempotent: true,
            });
        }

        let expected_staging_key = keys::lodging_staging_key(lodging_id, request.image_id);
        let pending = media
            .pending_uploads
            .iter()
            .find(|entry| entry.image_id == request.image_id);
        self.policy
            .assert_pending_upload_valid(pending, &expected_staging_key, Utc::now())?;

        let staging_head = self.storage.head_object(&expected_staging_key).await?;
        if !staging_head.exists {
            return Err(AppError::ObjectNotFound(
                "Pending upload object not found in storage".to_string(),
            ));
        }

        // Revalidate with what storage actually reports, not what the client
        // declared at reservation time.
        content::assert_allowed_mime(&self.settings.allowed_mimes, staging_head.mime.as_deref())?;
        content::assert_size_within_limit(staging_head.bytes, self.settings.max_bytes)?;

        let final_key = keys::lodging_final_key(lodging_id, request.image_id);
        let final_head = self.storage.head_object(&final_key).await?;

        let processed = if final_head.exists {
            // A prior confirmation crashed after normalizing. Reuse the
            // materialized object instead of re-running the pipeline.
            ProcessedImage {
                width: request.width,
                height: request.height,
                bytes: final_head.bytes.or(staging_head.bytes),
                mime: final_head.mime.or_else(|| Some(WEBP_MIME.to_string())),
            }
        } else {
            self.normalize_into(&expected_staging_key, &final_key).await?
        };

        let image = LodgingImage {
            image_id: request.image_id,
            key: final_key,
            is_default: media.images.is_empty(),
            width: processed.width,
            height: processed.height,
            bytes: processed.bytes,
            mime: processed.mime,
            created_at: Utc::now(),
        };

        let promoted = self
            .store
            .try_promote_image(lodging_id, scope, image, self.policy.max_images)
            .await?;

        let updated = match promoted {
            Some(updated) => updated,
            None => {
                // Lost the promotion race. If the other writer materialized
                // this image id, that is our success.
                let latest = self.find_owned_media(lodging_id, scope).await?;
                if let Some(existing) = latest
                    .images
                    .iter()
                    .find(|image| image.image_id == request.image_id)
                {
                    return Ok(ConfirmLodgingImageResponse {
                        image: self.to_image_response(existing),
                        idempotent: true,
                    });
                }
                return Err(AppError::StateConflict(
                    "Could not confirm the image due to a state conflict".to_string(),
                ));
            }
        };

        let updated = self.ensure_default_invariant(lodging_id, updated).await?;

        spawn_delete_object(
            Arc::clone(&self.storage),
            expected_staging_key,
            "staging object after confirmation",
        );

        let persisted = updated
            .images
            .iter()
            .find(|image| image.image_id == request.image_id)
            .ok_or_else(|| {
                AppError::Internal("Lodging image not found after confirmation".to_string())
            })?;

        tracing::info!(key = %persisted.key, "Confirmed lodging image");

        Ok(ConfirmLodgingImageResponse {
            image: self.to_image_response(persisted),
            idempotent: false,
        })
    }

    /// Mark one image as default and clear the flag on all others.
    #[tracing::instrument(skip(self), fields(lodging_id = %lodging_id, image_id = %image_id))]
    pub async fn set_default_image(
        &self,
        lodging_id: Uuid,
        image_id: Uuid,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<SetDefaultLodgingImageResponse, AppError> {
        let scope = OwnerScope::for_role(role, requester_id);
        let media = self.find_owned_media(lodging_id, scope).await?;
        let mut images = media.images;

        if !images.iter().any(|image| image.image_id == image_id) {
            return Err(AppError::NotFound("Lodging image not found".to_string()));
        }

        for image in &mut images {
            image.is_default = image.image_id == image_id;
        }

        self.policy.assert_valid_images_state(&images)?;
        self.store.replace_images(lodging_id, images.clone()).await?;

        Ok(SetDefaultLodgingImageResponse {
            images: images.iter().map(|image| self.to_image_response(image)).collect(),
        })
    }

    /// Delete an image, best-effort delete its backing object, and promote
    /// the first remaining image if the default was removed.
    #[tracing::instrument(skip(self), fields(lodging_id = %lodging_id, image_id = %image_id))]
    pub async fn delete_image(
        &self,
        lodging_id: Uuid,
        image_id: Uuid,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<DeleteLodgingImageResponse, AppError> {
        let scope = OwnerScope::for_role(role, requester_id);
        let media = self.find_owned_media(lodging_id, scope).await?;
        let mut images = media.images;

        let target_index = images
            .iter()
            .position(|image| image.image_id == image_id)
            .ok_or_else(|| AppError::NotFound("Lodging image not found".to_string()))?;

        let removed = images.remove(target_index);
        spawn_delete_object(
            Arc::clone(&self.storage),
            removed.key,
            "deleted lodging image object",
        );

        if !images.is_empty() && !images.iter().any(|image| image.is_default) {
            images[0].is_default = true;
        }

        self.policy.assert_valid_images_state(&images)?;
        self.store.replace_images(lodging_id, images.clone()).await?;

        Ok(DeleteLodgingImageResponse {
            deleted: true,
            images: images.iter().map(|image| self.to_image_response(image)).collect(),
        })
    }

    async fn find_owned_media(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
    ) -> Result<LodgingMedia, AppError> {
        self.store
            .find_media(lodging_id, scope)
            .await?
            .ok_or_else(|| AppError::NotFound("Lodging not found".to_string()))
    }

    /// Stream the staged object through the normalizer into the final
    /// location. The destination write and the metadata future complete
    /// together; the full image is never rebuffered between stages.
    async fn normalize_into(
        &self,
        staging_key: &str,
        final_key: &str,
    ) -> Result<ProcessedImage, AppError> {
        let source = self.storage.get_object_stream(staging_key).await?;
        let job = self.normalizer.normalize(
            source.stream,
            NormalizeOptions {
                max_width: self.settings.max_width,
                max_height: self.settings.max_height,
                quality: self.settings.webp_quality,
            },
        );

        let put = self.storage.put_object(PutObjectRequest {
            key: final_key.to_string(),
            body: job.output,
            content_type: WEBP_MIME.to_string(),
            cache_control: Some(IMMUTABLE_CACHE_CONTROL.to_string()),
        });

        let ((), metadata) = tokio::try_join!(
            async { put.await.map_err(AppError::from) },
            async { job.metadata.wait().await.map_err(AppError::from) },
        )?;

        Ok(ProcessedImage {
            width: Some(metadata.width),
            height: Some(metadata.height),
            bytes: Some(metadata.bytes as i64),
            mime: Some(metadata.mime.to_string()),
        })
    }

    /// Post-promotion repair: if a race produced zero or multiple defaults,
    /// clear all and set the first image as default.
    async fn ensure_default_invariant(
        &self,
        lodging_id: Uuid,
        media: LodgingMedia,
    ) -> Result<LodgingMedia, AppError> {
        if media.images.is_empty() {
            return Ok(media);
        }

        let default_count = media.images.iter().filter(|image| image.is_default).count();
        if default_count == 1 {
            return Ok(media);
        }

        tracing::warn!(
            lodging_id = %lodging_id,
            default_count = default_count,
            "Repairing lodging default image invariant"
        );

        let mut images = media.images;
        for image in &mut images {
            image.is_default = false;
        }
        images[0].is_default = true;

        self.policy.assert_valid_images_state(&images)?;
        self.store.replace_images(lodging_id, images.clone()).await?;

        Ok(LodgingMedia {
            images,
            pending_uploads: media.pending_uploads,
        })
    }

    fn to_image_response(&self, image: &LodgingImage) -> LodgingImageResponse {
        LodgingImageResponse {
            image_id: image.image_id,
            key: image.key.clone(),
            is_default: image.is_default,
            width: image.width,
            height: image.height,
            bytes: image.bytes,
            mime: image.mime.clone(),
            created_at: image.created_at,
            url: self.urls.build_public_url(&image.key),
            variants: self.urls.build_lodging_variants(&image.key),
        }
    }
}
