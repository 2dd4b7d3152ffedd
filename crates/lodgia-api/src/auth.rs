//! Requester identity extraction.
//!
//! Token verification happens at the edge gateway, which injects the
//! verified identity as headers. This extractor only parses them; requests
//! that reach the API without the headers are rejected.

use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lodgia_core::models::UserRole;
use lodgia_core::AppError;
use uuid::Uuid;

pub const OWNER_ID_HEADER: &str = "x-auth-owner-id";
pub const ROLE_HEADER: &str = "x-auth-role";

/// Verified requester identity: the owner id used for scoping and the role
/// deciding whether scoping applies at all.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub requester_id: Uuid,
    pub role: UserRole,
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let requester_id = parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing authenticated owner id".to_string(),
                ))
            })?;
        let requester_id = Uuid::parse_str(requester_id).map_err(|_| {
            HttpAppError(AppError::Unauthorized(
                "Invalid authenticated owner id".to_string(),
            ))
        })?;

        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("ADMIN");
        let role = role
            .parse::<UserRole>()
            .map_err(|e| HttpAppError(AppError::Unauthorized(e)))?;

        Ok(AuthContext { requester_id, role })
    }
}
