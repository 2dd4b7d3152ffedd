//! OpenAPI document for the media endpoints.

use crate::error::ErrorResponse;
use lodgia_core::models::{
    ConfirmImageRequest, ConfirmLodgingImageResponse, ConfirmProfileImageResponse,
    DeleteLodgingImageResponse, DeleteProfileImageResponse, ImageUploadUrlResponse,
    LodgingImageResponse, MediaUrlVariants, ProfileImageResponse, RequestImageUploadUrl,
    SetDefaultLodgingImageResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::lodging_images::create_upload_url,
        crate::handlers::lodging_images::confirm_upload,
        crate::handlers::lodging_images::set_default_image,
        crate::handlers::lodging_images::delete_image,
        crate::handlers::profile_images::create_upload_url,
        crate::handlers::profile_images::confirm_upload,
        crate::handlers::profile_images::delete_profile_image,
        crate::handlers::health::health_check,
    ),
    components(schemas(
        RequestImageUploadUrl,
        ImageUploadUrlResponse,
        ConfirmImageRequest,
        ConfirmLodgingImageResponse,
        ConfirmProfileImageResponse,
        SetDefaultLodgingImageResponse,
        DeleteLodgingImageResponse,
        DeleteProfileImageResponse,
        LodgingImageResponse,
        ProfileImageResponse,
        MediaUrlVariants,
        ErrorResponse,
    )),
    tags(
        (name = "lodging-images", description = "Lodging photo upload workflow"),
        (name = "profile-images", description = "User profile picture upload workflow"),
        (name = "health", description = "Service health"),
    ),
    info(
        title = "lodgia API",
        description = "Media upload reservation and confirmation API for the lodging catalog"
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
