//! User profile image upload coordinator.
//!
//! Same protocol shape as the lodging flow with a single-image twist: a
//! profile holds at most one image and confirmation replaces the previous
//! one, best-effort deleting its backing object.

use crate::content;
use crate::{spawn_delete_object, IMMUTABLE_CACHE_CONTROL};
use chrono::{Duration, Utc};
use lodgia_core::models::{
    ConfirmImageRequest, ConfirmProfileImageResponse, DeleteProfileImageResponse,
    ImageUploadUrlResponse, PendingUpload, ProfileImage, ProfileImageResponse,
    RequestImageUploadUrl, UserRole,
};
use lodgia_core::policy::ImagePolicy;
use lodgia_core::{AppError, ImageUploadSettings};
use lodgia_db::{OwnerScope, UserProfileMedia, UserProfileStore};
use lodgia_processing::{ImageNormalizer, NormalizeOptions, WEBP_MIME};
use lodgia_storage::keys;
use lodgia_storage::{
    MediaUrlBuilder, ObjectStorage, PutObjectRequest, SignedPutRequest,
};
use std::sync::Arc;
use uuid::Uuid;

struct ProcessedImage {
    width: Option<u32>,
    height: Option<u32>,
    bytes: Option<i64>,
    mime: Option<String>,
}

pub struct UserProfileImagesService {
    store: Arc<dyn UserProfileStore>,
    storage: Arc<dyn ObjectStorage>,
    normalizer: Arc<dyn ImageNormalizer>,
    urls: Arc<dyn MediaUrlBuilder>,
    policy: ImagePolicy,
    settings: ImageUploadSettings,
}

impl UserProfileImagesService {
    pub fn new(
        store: Arc<dyn UserProfileStore>,
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
            policy: ImagePolicy::PROFILE,
            settings,
        }
    }

    /// Reserve a profile image upload and issue a signed PUT URL. The append
    /// is not capacity-guarded: profiles replace on confirm.
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = %user_id, requester_id = %requester_id)
    )]
    pub async fn create_upload_url(
        &self,
        user_id: Uuid,
        request: &RequestImageUploadUrl,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<ImageUploadUrlResponse, AppError> {
        content::assert_allowed_mime(&self.settings.allowed_mimes, request.mime.as_deref())?;
        content::assert_size_within_limit(request.size, self.settings.max_bytes)?;

        let scope = OwnerScope::for_role(role, requester_id);
        self.find_owned_profile(user_id, scope).await?;

        let image_id = Uuid::new_v4();
        let staging_key = keys::profile_staging_key(user_id, image_id);
        let now = Utc::now();
        let pending = PendingUpload {
            image_id,
            staging_key: staging_key.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(self.settings.pending_ttl_seconds),
        };

        let applied = self.store.add_pending(user_id, scope, pending).await?;
        if !applied {
            return Err(AppError::NotFound("User not found".to_string()));
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
            "Reserved profile image upload"
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

    /// Confirm a profile image upload, replacing any previous image.
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = %user_id, image_id = %request.image_id)
    )]
    pub async fn confirm_upload(
        &self,
        user_id: Uuid,
        request: &ConfirmImageRequest,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<ConfirmProfileImageResponse, AppError> {
        let scope = OwnerScope::for_role(role, requester_id);
        let media = self.find_owned_profile(user_id, scope).await?;
        let current = media.profile_image.clone();

        if let Some(ref existing) = current {
            if existing.image_id == request.image_id {
                return Ok(ConfirmProfileImageResponse {
                    image: self.to_image_response(existing),
                    idempotent: true,
                });
            }
        }

        let expected_staging_key = keys::profile_staging_key(user_id, request.image_id);
        let pending = media
            .pending_uploads
            .iter()
            .find(|entry| entry.image_id == request.image_id);
        self.policy
            .assert_pending_upload_valid(pending, &expected_staging_key, Utc::now())?;

        let staging_head = self.storage.head_object(&expected_staging_key).await?;
        if !staging_head.exists {
            return Err(AppError::ObjectNotFound(
                "Pending profile image upload not found in storage".to_string(),
            ));
        }

        content::assert_allowed_mime(&self.settings.allowed_mimes, staging_head.mime.as_deref())?;
        content::assert_size_within_limit(staging_head.bytes, self.settings.max_bytes)?;

        let final_key = keys::profile_final_key(user_id, request.image_id);
        let final_head = self.storage.head_object(&final_key).await?;

        let processed = if final_head.exists {
            ProcessedImage {
                width: request.width,
                height: request.height,
                bytes: final_head.bytes.or(staging_head.bytes),
                mime: final_head.mime.or_else(|| Some(WEBP_MIME.to_string())),
            }
        } else {
            self.normalize_into(&expected_staging_key, &final_key).await?
        };

        let image = ProfileImage {
            image_id: request.image_id,
            key: final_key.clone(),
            width: processed.width,
            height: processed.height,
            bytes: processed.bytes,
            mime: processed.mime,
            created_at: Utc::now(),
        };
        let avatar_url = self.urls.build_public_url(&final_key);

        let promoted = self
            .store
            .try_promote_profile(user_id, scope, image, avatar_url)
            .await?;

        let updated = match promoted {
            Some(updated) => updated,
            None => {
                let latest = self.find_owned_profile(user_id, scope).await?;
                if let Some(existing) = latest.profile_image {
                    if existing.image_id == request.image_id {
                        return Ok(ConfirmProfileImageResponse {
                            image: self.to_image_response(&existing),
                            idempotent: true,
                        });
                    }
                }
                return Err(AppError::StateConflict(
                    "Could not confirm the profile image due to a state conflict".to_string(),
                ));
            }
        };

        // The replaced image's object is orphaned now; clean it up unless the
        // keys collide (same image id confirmed through another path).
        if let Some(previous) = current {
            if previous.key != final_key {
                spawn_delete_object(
                    Arc::clone(&self.storage),
                    previous.key,
                    "superseded profile image object",
                );
            }
        }
        spawn_delete_object(
            Arc::clone(&self.storage),
            expected_staging_key,
            "staging object after confirmation",
        );

        let persisted = updated.profile_image.ok_or_else(|| {
            AppError::Internal("Profile image not found after confirmation".to_string())
        })?;

        tracing::info!(key = %persisted.key, "Confirmed profile image");

        Ok(ConfirmProfileImageResponse {
            image: self.to_image_response(&persisted),
            idempotent: false,
        })
    }

    /// Delete the profile image: best-effort object deletion, then unset the
    /// image and the denormalized avatar URL.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_profile_image(
        &self,
        user_id: Uuid,
        requester_id: Uuid,
        role: UserRole,
    ) -> Result<DeleteProfileImageResponse, AppError> {
        let scope = OwnerScope::for_role(role, requester_id);
        let media = self.find_owned_profile(user_id, scope).await?;

        if let Some(image) = media.profile_image {
            spawn_delete_object(
                Arc::clone(&self.storage),
                image.key,
                "deleted profile image object",
            );
        }

        self.store.clear_profile(user_id, scope).await?;

        Ok(DeleteProfileImageResponse { deleted: true })
    }

    async fn find_owned_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
    ) -> Result<UserProfileMedia, AppError> {
        self.store
            .find_profile(user_id, scope)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

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

    fn to_image_response(&self, image: &ProfileImage) -> ProfileImageResponse {
        ProfileImageResponse {
            image_id: image.image_id,
            key: image.key.clone(),
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
