//! Request/response DTOs for the image upload protocol.
//!
//! Wire format is camelCase, matching the public API contract consumed by
//! the admin frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Request a signed upload URL for a new image slot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestImageUploadUrl {
    /// Declared content type, e.g. `image/jpeg`. Validated against the
    /// allow-list when present; the staged object is re-validated at
    /// confirmation with the values storage actually reports.
    #[schema(example = "image/jpeg")]
    pub mime: Option<String>,
    /// Declared object size in bytes.
    #[validate(range(min = 1, message = "Size must be at least 1 byte"))]
    #[schema(example = 5242880)]
    pub size: Option<i64>,
    /// Informational only; keys are derived, never taken from filenames.
    #[validate(length(max = 255, message = "Filename must be at most 255 characters"))]
    #[schema(example = "cabana-frente.jpg")]
    pub original_filename: Option<String>,
}

/// Response to an upload-slot reservation: where and how to PUT the bytes.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadUrlResponse {
    /// Identifier to confirm with once the upload finishes.
    pub image_id: Uuid,
    /// Staging key the signed URL writes to.
    pub upload_key: String,
    pub upload_url: String,
    /// Always `PUT`.
    pub method: String,
    /// Headers the client must send verbatim with the upload.
    pub required_headers: HashMap<String, String>,
    pub expires_in_seconds: u64,
}

/// Confirm an upload after the bytes have been PUT to the signed URL.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmImageRequest {
    pub image_id: Uuid,
    /// Staging key echoed back by the client. The server recomputes the
    /// expected key from `(owner_id, image_id)` and does not trust this.
    pub key: String,
    pub etag: Option<String>,
    /// Client-measured dimensions, used only when normalization is skipped
    /// because the final object already exists.
    #[validate(range(min = 1))]
    pub width: Option<u32>,
    #[validate(range(min = 1))]
    pub height: Option<u32>,
}

/// Public URLs for the rendered lodging variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaUrlVariants {
    pub thumb: String,
    pub card: String,
    pub hero: String,
}

/// Public representation of a persisted lodging image.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LodgingImageResponse {
    pub image_id: Uuid,
    pub key: String,
    pub is_default: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub variants: MediaUrlVariants,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmLodgingImageResponse {
    pub image: LodgingImageResponse,
    /// Present (true) when the confirmation was replayed against an already
    /// materialized image instead of performing new work.
    #[serde(default, skip_serializing_if = "is_false")]
    pub idempotent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultLodgingImageResponse {
    pub images: Vec<LodgingImageResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLodgingImageResponse {
    pub deleted: bool,
    pub images: Vec<LodgingImageResponse>,
}

/// Public representation of a user profile image.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageResponse {
    pub image_id: Uuid,
    pub key: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub variants: MediaUrlVariants,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmProfileImageResponse {
    pub image: ProfileImageResponse,
    #[serde(default, skip_serializing_if = "is_false")]
    pub idempotent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProfileImageResponse {
    pub deleted: bool,
}
