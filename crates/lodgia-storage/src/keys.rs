//! Deterministic storage key derivation.
//!
//! Both the staging and final keys are pure functions of the owner id and
//! image id, so a confirmation can always recompute the expected staging key
//! without extra lookups. Staging and final locations never collide.

use uuid::Uuid;

/// Staging location a lodging image is uploaded to before normalization.
pub fn lodging_staging_key(lodging_id: Uuid, image_id: Uuid) -> String {
    format!("lodgings/{}/{}/staging-upload", lodging_id, image_id)
}

/// Final location of a normalized lodging image.
pub fn lodging_final_key(lodging_id: Uuid, image_id: Uuid) -> String {
    format!("lodgings/{}/{}/original.webp", lodging_id, image_id)
}

/// Staging location a profile image is uploaded to before normalization.
pub fn profile_staging_key(user_id: Uuid, image_id: Uuid) -> String {
    format!("users/{}/profile/{}/staging-upload", user_id, image_id)
}

/// Final location of a normalized profile image.
pub fn profile_final_key(user_id: Uuid, image_id: Uuid) -> String {
    format!("users/{}/profile/{}/original.webp", user_id, image_id)
}
