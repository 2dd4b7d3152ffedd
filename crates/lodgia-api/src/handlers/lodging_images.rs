//! Lodging image endpoints (admin surface).

use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lodgia_core::models::{
    ConfirmImageRequest, ConfirmLodgingImageResponse, DeleteLodgingImageResponse,
    ImageUploadUrlResponse, RequestImageUploadUrl, SetDefaultLodgingImageResponse,
};
use std::sync::Arc;
use uuid::Uuid;

/// Reserve an image slot and get a signed upload URL
#[utoipa::path(
    post,
    path = "/api/v1/admin/lodgings/{lodging_id}/images/upload-url",
    tag = "lodging-images",
    params(("lodging_id" = Uuid, Path, description = "Lodging identifier")),
    request_body = RequestImageUploadUrl,
    responses(
        (status = 200, description = "Slot reserved, upload URL issued", body = ImageUploadUrlResponse),
        (status = 400, description = "Invalid input or capacity reached", body = ErrorResponse),
        (status = 404, description = "Lodging not found", body = ErrorResponse),
        (status = 409, description = "Reservation conflict", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(lodging_id = %lodging_id, requester_id = %auth.requester_id, operation = "lodging_image_upload_url")
)]
pub async fn create_upload_url(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path(lodging_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RequestImageUploadUrl>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .lodging_images
        .create_upload_url(lodging_id, &request, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}

/// Confirm an uploaded image
#[utoipa::path(
    post,
    path = "/api/v1/admin/lodgings/{lodging_id}/images/confirm",
    tag = "lodging-images",
    params(("lodging_id" = Uuid, Path, description = "Lodging identifier")),
    request_body = ConfirmImageRequest,
    responses(
        (status = 200, description = "Image confirmed (possibly idempotent replay)", body = ConfirmLodgingImageResponse),
        (status = 400, description = "Reservation or content validation failed", body = ErrorResponse),
        (status = 404, description = "Lodging, reservation, or staged object not found", body = ErrorResponse),
        (status = 409, description = "Unresolvable state conflict", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(lodging_id = %lodging_id, requester_id = %auth.requester_id, operation = "lodging_image_confirm")
)]
pub async fn confirm_upload(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path(lodging_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ConfirmImageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .lodging_images
        .confirm_upload(lodging_id, &request, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}

/// Mark an image as the lodging's default
#[utoipa::path(
    patch,
    path = "/api/v1/admin/lodgings/{lodging_id}/images/{image_id}/default",
    tag = "lodging-images",
    params(
        ("lodging_id" = Uuid, Path, description = "Lodging identifier"),
        ("image_id" = Uuid, Path, description = "Image identifier")
    ),
    responses(
        (status = 200, description = "Default image updated", body = SetDefaultLodgingImageResponse),
        (status = 404, description = "Lodging or image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(lodging_id = %lodging_id, image_id = %image_id, operation = "lodging_image_set_default")
)]
pub async fn set_default_image(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path((lodging_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .lodging_images
        .set_default_image(lodging_id, image_id, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}

/// Delete an image
#[utoipa::path(
    delete,
    path = "/api/v1/admin/lodgings/{lodging_id}/images/{image_id}",
    tag = "lodging-images",
    params(
        ("lodging_id" = Uuid, Path, description = "Lodging identifier"),
        ("image_id" = Uuid, Path, description = "Image identifier")
    ),
    responses(
        (status = 200, description = "Image deleted", body = DeleteLodgingImageResponse),
        (status = 404, description = "Lodging or image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state),
    fields(lodging_id = %lodging_id, image_id = %image_id, operation = "lodging_image_delete")
)]
pub async fn delete_image(
    auth: AuthContext,
    State(state): State<Arc<AppState>>,
    Path((lodging_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state
        .lodging_images
        .delete_image(lodging_id, image_id, auth.requester_id, auth.role)
        .await?;
    Ok(Json(response))
}
