//! Persistence layer for the lodgia media backend.
//!
//! The store traits express the atomic, conditionally-guarded state
//! transitions the upload coordinators rely on; the Postgres implementations
//! evaluate each guard and mutation together under the owner aggregate's row
//! lock. Test doubles implement the same traits in memory.

pub mod pg;
pub mod stores;

pub use pg::{PgLodgingMediaStore, PgUserProfileStore};
pub use stores::{
    LodgingMedia, LodgingMediaStore, OwnerScope, UserProfileMedia, UserProfileStore,
};

use lodgia_core::{AppError, Config};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connect a pool using the configured limits.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Apply pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
