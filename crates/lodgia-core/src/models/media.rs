//! Persisted media records embedded in the owner aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The only status a pending reservation is ever persisted with. A
/// reservation is removed on confirmation, never transitioned.
pub const PENDING_STATUS: &str = "PENDING";

/// An image attached to a lodging. Ordered within the lodging; exactly one
/// carries `is_default` whenever the collection is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodgingImage {
    pub image_id: Uuid,
    /// Final storage key, derived from `(lodging_id, image_id)`.
    pub key: String,
    pub is_default: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A capacity-holding reservation created before any bytes move. Expiry is
/// checked lazily at confirmation time; there is no background reaper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpload {
    pub image_id: Uuid,
    /// Staging storage key the client uploads to, derived from
    /// `(owner_id, image_id)`.
    pub staging_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A user's profile image. At most one exists per user; confirmation
/// replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileImage {
    pub image_id: Uuid,
    pub key: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<i64>,
    pub mime: Option<String>,
    pub created_at: DateTime<Utc>,
}
