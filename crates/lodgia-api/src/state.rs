//! Application state: configuration plus the wired-up coordinators.
//!
//! Collaborators are constructor-injected behind their traits, so nothing
//! here depends on a concrete storage or normalizer implementation.

use lodgia_core::Config;
use lodgia_db::{PgLodgingMediaStore, PgUserProfileStore};
use lodgia_processing::{ImageNormalizer, WebpNormalizer};
use lodgia_services::{LodgingImagesService, UserProfileImagesService};
use lodgia_storage::{create_storage, create_url_builder, ObjectStorage};
use sqlx::PgPool;
use std::sync::Arc;

pub struct AppState {
    pub db_pool: PgPool,
    pub storage: Arc<dyn ObjectStorage>,
    pub lodging_images: LodgingImagesService,
    pub profile_images: UserProfileImagesService,
}

/// Connect the database, run migrations, build the storage gateway, and wire
/// both upload coordinators.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>, anyhow::Error> {
    let pool = lodgia_db::connect(config).await?;
    lodgia_db::run_migrations(&pool).await?;

    let storage = create_storage(config)?;
    let urls = create_url_builder(config);
    let normalizer: Arc<dyn ImageNormalizer> = Arc::new(WebpNormalizer);

    let lodging_images = LodgingImagesService::new(
        Arc::new(PgLodgingMediaStore::new(pool.clone())),
        Arc::clone(&storage),
        Arc::clone(&normalizer),
        Arc::clone(&urls),
        config.lodging_image_settings(),
    );

    let profile_images = UserProfileImagesService::new(
        Arc::new(PgUserProfileStore::new(pool.clone())),
        Arc::clone(&storage),
        normalizer,
        urls,
        config.profile_image_settings(),
    );

    Ok(Arc::new(AppState {
        db_pool: pool,
        storage,
        lodging_images,
        profile_images,
    }))
}
