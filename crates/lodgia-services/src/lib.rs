//! Upload coordinators for the lodgia media backend.
//!
//! Two near-identical services drive the reserve → upload → confirm protocol
//! against their owner aggregates: [`LodgingImagesService`] (up to five
//! images, exactly-one-default invariant) and [`UserProfileImagesService`]
//! (single image, replaced on confirmation). Both depend only on the
//! collaborator traits, so tests substitute in-memory doubles.

mod content;
pub mod lodging_images;
pub mod profile_images;

pub use lodging_images::LodgingImagesService;
pub use profile_images::UserProfileImagesService;

use lodgia_storage::ObjectStorage;
use std::sync::Arc;

/// Cache policy stamped on normalized objects; final keys are immutable.
pub(crate) const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Fire-and-forget object deletion. Cleanup is not load-bearing for
/// correctness; failures are logged and never reach the caller.
pub(crate) fn spawn_delete_object(
    storage: Arc<dyn ObjectStorage>,
    key: String,
    context: &'static str,
) {
    tokio::spawn(async move {
        if let Err(e) = storage.delete_object(&key).await {
            tracing::warn!(
                error = %e,
                key = %key,
                context = context,
                "Best-effort object cleanup failed"
            );
        }
    });
}
