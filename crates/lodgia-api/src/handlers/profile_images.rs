//! User profile image endpoints.

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lodgia_core::models::{
    ConfirmImageRequest, ConfirmProfileImageResponse, DeleteProfileImageResponse,
    ImageUploadUrlResponse, RequestImageUploadUrl,
};
use std::sync::Arc;
use uuid::Uuid;

/// Reserve a profile image upload and get a signed upload URL
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/profile-image/upload-url",
    tag = "profile-images",
    params(("user_id" = Uuid, Path, description = "User identifier")),
    request_body = RequestImageUploadUrl,
    responses(
        (status = 200, description = "Upload URL issued", body = ImageUploadUrlResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %user_id, requester_id = %auth.requester_id, operation = "profile_image_upload_url")
)]
pub async fn create_upload_url(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RequestImageUploadUrl>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .profile_images
        .create_upload_url(user_id, &request, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}

/// Confirm an uploaded profile image (replaces the previous one)
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/profile-image/confirm",
    tag = "profile-images",
    params(("user_id" = Uuid, Path, description = "User identifier")),
    request_body = ConfirmImageRequest,
    responses(
        (status = 200, description = "Profile image confirmed (possibly idempotent replay)", body = ConfirmProfileImageResponse),
        (status = 400, description = "Reservation or content validation failed", body = ErrorResponse),
        (status = 404, description = "User, reservation, or staged object not found", body = ErrorResponse),
        (status = 409, description = "Unresolvable state conflict", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %user_id, requester_id = %auth.requester_id, operation = "profile_image_confirm")
)]
pub async fn confirm_upload(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ConfirmImageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .profile_images
        .confirm_upload(user_id, &request, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}

/// Delete the profile image
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/profile-image",
    tag = "profile-images",
    params(("user_id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Profile image deleted", body = DeleteProfileImageResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = %user_id, requester_id = %auth.requester_id, operation = "profile_image_delete")
)]
pub async fn delete_profile_image(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .profile_images
        .delete_profile_image(user_id, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}
