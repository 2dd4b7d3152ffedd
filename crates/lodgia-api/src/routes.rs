//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use lodgia_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route(
            "/admin/lodgings/{lodging_id}/images/upload-url",
            post(handlers::lodging_images::create_upload_url),
        )
        .route(
            "/admin/lodgings/{lodging_id}/images/confirm",
            post(handlers::lodging_images::confirm_upload),
        )
        .route(
            "/admin/lodgings/{lodging_id}/images/{image_id}/default",
            patch(handlers::lodging_images::set_default_image),
        )
        .route(
            "/admin/lodgings/{lodging_id}/images/{image_id}",
            delete(handlers::lodging_images::delete_image),
        )
        .route(
            "/users/{user_id}/profile-image/upload-url",
            post(handlers::profile_images::create_upload_url),
        )
        .route(
            "/users/{user_id}/profile-image/confirm",
            post(handlers::profile_images::confirm_upload),
        )
        .route(
            "/users/{user_id}/profile-image",
            delete(handlers::profile_images::delete_profile_image),
        );

    let router = Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin {}: {}", origin, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
