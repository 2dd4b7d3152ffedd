//! Persistence seams for the owner aggregates.
//!
//! Every transition that must be exclusive (slot reservation, confirmation
//! promotion) is a single store call whose guard and mutation are evaluated
//! together by the implementation. Callers detect a lost race by getting
//! `false`/`None` back, re-reading, and classifying the outcome themselves.

use async_trait::async_trait;
use lodgia_core::models::{LodgingImage, PendingUpload, ProfileImage, UserRole};
use lodgia_core::AppError;
use uuid::Uuid;

/// Ownership filter applied when resolving an aggregate. Elevated roles see
/// every owner; everyone else only their own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Any,
    Owner(Uuid),
}

impl OwnerScope {
    pub fn for_role(role: UserRole, requester_id: Uuid) -> Self {
        match role {
            UserRole::Superadmin => OwnerScope::Any,
            UserRole::Admin => OwnerScope::Owner(requester_id),
        }
    }

    /// The owner id to filter by, or `None` for an unscoped lookup.
    pub fn owner_id(&self) -> Option<Uuid> {
        match self {
            OwnerScope::Any => None,
            OwnerScope::Owner(id) => Some(*id),
        }
    }
}

/// A lodging's media state: persisted images (ordered) plus pending
/// reservations.
#[derive(Debug, Clone, Default)]
pub struct LodgingMedia {
    pub images: Vec<LodgingImage>,
    pub pending_uploads: Vec<PendingUpload>,
}

/// A user's profile media state.
#[derive(Debug, Clone, Default)]
pub struct UserProfileMedia {
    pub profile_image: Option<ProfileImage>,
    pub pending_uploads: Vec<PendingUpload>,
}

#[async_trait]
pub trait LodgingMediaStore: Send + Sync {
    /// Read the media state of an owned lodging. `None` when the lodging is
    /// missing or not visible in the scope.
    async fn find_media(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<LodgingMedia>, AppError>;

    /// Append a pending reservation iff
    /// `images + pending_uploads < max_images` holds at the same instant as
    /// the write. Returns whether the reservation was applied.
    async fn try_reserve_slot(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
        max_images: usize,
    ) -> Result<bool, AppError>;

    /// Promote a confirmed upload: push the image and pull the matching
    /// reservation, conditioned on the reservation still existing, no image
    /// already holding this id, and the image count staying below
    /// `max_images`. Returns the post-transition state when applied, `None`
    /// when any condition failed.
    async fn try_promote_image(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        image: LodgingImage,
        max_images: usize,
    ) -> Result<Option<LodgingMedia>, AppError>;

    /// Overwrite the image collection (set-default, delete, invariant
    /// repair). Order of the slice becomes the persisted order.
    async fn replace_images(
        &self,
        lodging_id: Uuid,
        images: Vec<LodgingImage>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserProfileStore: Send + Sync {
    /// Read an owned user's profile media state.
    async fn find_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<UserProfileMedia>, AppError>;

    /// Append a pending reservation. Unconditional aside from ownership;
    /// profiles replace on confirm. Returns whether the owner row matched.
    async fn add_pending(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
    ) -> Result<bool, AppError>;

    /// Replace the profile image and denormalized avatar URL while pulling
    /// the matching reservation, conditioned on the reservation existing.
    async fn try_promote_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        image: ProfileImage,
        avatar_url: String,
    ) -> Result<Option<UserProfileMedia>, AppError>;

    /// Unset the profile image and avatar URL. Returns whether the owner row
    /// matched.
    async fn clear_profile(&self, user_id: Uuid, scope: OwnerScope) -> Result<bool, AppError>;
}
