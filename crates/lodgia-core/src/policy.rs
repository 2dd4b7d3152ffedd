//! Pure image-collection policy evaluator. No I/O; shared by the lodging
//! and user-profile flows with different capacities.

use crate::error::AppError;
use crate::models::{LodgingImage, PendingUpload};
use chrono::{DateTime, Utc};

/// Capacity and state rules for an owner's image collection.
#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    pub max_images: usize,
}

impl ImagePolicy {
    /// Lodgings carry up to five images.
    pub const LODGING: ImagePolicy = ImagePolicy { max_images: 5 };
    /// User profiles hold a single image, replaced on confirmation.
    pub const PROFILE: ImagePolicy = ImagePolicy { max_images: 1 };

    /// A slot can be reserved only while persisted images plus pending
    /// reservations stay below the capacity. Expired reservations still
    /// count; they are only evicted by failed confirmations never arriving.
    pub fn assert_can_reserve_slot(
        &self,
        images_count: usize,
        pending_count: usize,
    ) -> Result<(), AppError> {
        if images_count + pending_count >= self.max_images {
            return Err(AppError::LimitExceeded(
                "Image limit exceeded".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a pending reservation against the recomputed staging key and
    /// the current time. The boundary is inclusive: a reservation expiring
    /// exactly now is already expired.
    pub fn assert_pending_upload_valid<'a>(
        &self,
        pending: Option<&'a PendingUpload>,
        expected_staging_key: &str,
        now: DateTime<Utc>,
    ) -> Result<&'a PendingUpload, AppError> {
        let pending = pending.ok_or_else(|| {
            AppError::PendingNotFound("Pending image upload not found".to_string())
        })?;

        if pending.staging_key != expected_staging_key {
            return Err(AppError::InvalidUploadKey(
                "Invalid image upload key".to_string(),
            ));
        }

        if pending.expires_at <= now {
            return Err(AppError::PendingExpired(
                "Pending image upload expired".to_string(),
            ));
        }

        Ok(pending)
    }

    /// Validate a persisted image collection: within capacity, and exactly
    /// one default whenever non-empty.
    pub fn assert_valid_images_state(&self, images: &[LodgingImage]) -> Result<(), AppError> {
        if images.len() > self.max_images {
            return Err(AppError::LimitExceeded(
                "Image limit exceeded".to_string(),
            ));
        }

        if images.is_empty() {
            return Ok(());
        }

        let default_count = images.iter().filter(|image| image.is_default).count();
        if default_count != 1 {
            return Err(AppError::InvalidDefaultState(
                "Invalid images default state".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn image(is_default: bool) -> LodgingImage {
        LodgingImage {
            image_id: Uuid::new_v4(),
            key: "lodgings/x/y/original.webp".to_string(),
            is_default,
            width: None,
            height: None,
            bytes: None,
            mime: None,
            created_at: Utc::now(),
        }
    }

    fn pending(staging_key: &str, expires_at: DateTime<Utc>) -> PendingUpload {
        PendingUpload {
            image_id: Uuid::new_v4(),
            staging_key: staging_key.to_string(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_reserve_slot_counts_pending_against_capacity() {
        let policy = ImagePolicy::LODGING;
        assert!(policy.assert_can_reserve_slot(4, 0).is_ok());
        assert!(matches!(
            policy.assert_can_reserve_slot(4, 1),
            Err(AppError::LimitExceeded(_))
        ));
        assert!(matches!(
            policy.assert_can_reserve_slot(5, 0),
            Err(AppError::LimitExceeded(_))
        ));
        assert!(matches!(
            policy.assert_can_reserve_slot(0, 5),
            Err(AppError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_profile_policy_allows_single_slot() {
        let policy = ImagePolicy::PROFILE;
        assert!(policy.assert_can_reserve_slot(0, 0).is_ok());
        assert!(matches!(
            policy.assert_can_reserve_slot(1, 0),
            Err(AppError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_pending_validation_missing() {
        let policy = ImagePolicy::LODGING;
        let result = policy.assert_pending_upload_valid(None, "key", Utc::now());
        assert!(matches!(result, Err(AppError::PendingNotFound(_))));
    }

    #[test]
    fn test_pending_validation_key_mismatch() {
        let policy = ImagePolicy::LODGING;
        let entry = pending("lodgings/a/b/staging-upload", Utc::now() + Duration::hours(1));
        let result = policy.assert_pending_upload_valid(Some(&entry), "lodgings/a/c/staging-upload", Utc::now());
        assert!(matches!(result, Err(AppError::InvalidUploadKey(_))));
    }

    #[test]
    fn test_pending_expiry_boundary_is_inclusive() {
        let policy = ImagePolicy::LODGING;
        let now = Utc::now();
        let key = "lodgings/a/b/staging-upload";

        // Expiring exactly now: expired.
        let at_now = pending(key, now);
        assert!(matches!(
            policy.assert_pending_upload_valid(Some(&at_now), key, now),
            Err(AppError::PendingExpired(_))
        ));

        // One millisecond of validity left: accepted.
        let just_ahead = pending(key, now + Duration::milliseconds(1));
        assert!(policy
            .assert_pending_upload_valid(Some(&just_ahead), key, now)
            .is_ok());

        // Already past: expired.
        let behind = pending(key, now - Duration::milliseconds(1));
        assert!(matches!(
            policy.assert_pending_upload_valid(Some(&behind), key, now),
            Err(AppError::PendingExpired(_))
        ));
    }

    #[test]
    fn test_images_state_requires_exactly_one_default() {
        let policy = ImagePolicy::LODGING;

        assert!(policy.assert_valid_images_state(&[]).is_ok());
        assert!(policy
            .assert_valid_images_state(&[image(true), image(false)])
            .is_ok());

        assert!(matches!(
            policy.assert_valid_images_state(&[image(false), image(false)]),
            Err(AppError::InvalidDefaultState(_))
        ));
        assert!(matches!(
            policy.assert_valid_images_state(&[image(true), image(true)]),
            Err(AppError::InvalidDefaultState(_))
        ));
    }

    #[test]
    fn test_images_state_rejects_overflow() {
        let policy = ImagePolicy::LODGING;
        let mut images: Vec<LodgingImage> = (0..6).map(|_| image(false)).collect();
        images[0].is_default = true;
        assert!(matches!(
            policy.assert_valid_images_state(&images),
            Err(AppError::LimitExceeded(_))
        ));
    }
}
