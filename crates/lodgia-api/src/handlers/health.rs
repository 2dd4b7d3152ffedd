//! Health probe: database reachability plus a storage canary round-trip.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use lodgia_core::ByteStream;
use lodgia_storage::PutObjectRequest;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All collaborators reachable"),
        (status = 503, description = "Database or storage unreachable")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = sqlx::query("SELECT 1").execute(&state.db_pool).await.is_ok();
    let storage = storage_probe(&state).await;
    let healthy = database && storage;

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "database": database,
            "storage": storage,
        })),
    )
}

/// Write, probe, and delete a canary object through the gateway.
async fn storage_probe(state: &AppState) -> bool {
    let key = format!("health/canary-{}", Uuid::new_v4().simple());
    let body: ByteStream = Box::pin(futures::stream::once(async {
        Ok(Bytes::from_static(b"ok"))
    }));

    let put = state
        .storage
        .put_object(PutObjectRequest {
            key: key.clone(),
            body,
            content_type: "text/plain".to_string(),
            cache_control: None,
        })
        .await;
    if let Err(e) = put {
        tracing::warn!(error = %e, key = %key, "Health canary write failed");
        return false;
    }

    let head_ok = matches!(
        state.storage.head_object(&key).await,
        Ok(head) if head.exists
    );

    if let Err(e) = state.storage.delete_object(&key).await {
        tracing::warn!(error = %e, key = %key, "Health canary cleanup failed");
    }

    head_ok
}
