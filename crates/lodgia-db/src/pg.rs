//! Postgres implementations of the media stores.
//!
//! Guarded transitions run inside a transaction that first locks the owner
//! aggregate's row (`FOR UPDATE`), so the guard and the mutation see the
//! same state and two concurrent writers cannot both succeed against the
//! same precondition.

use crate::stores::{
    LodgingMedia, LodgingMediaStore, OwnerScope, UserProfileMedia, UserProfileStore,
};
use async_trait::async_trait;
use lodgia_core::models::{LodgingImage, PendingUpload, ProfileImage, PENDING_STATUS};
use lodgia_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgLodgingMediaStore {
    pool: PgPool,
}

impl PgLodgingMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn image_from_row(row: &PgRow) -> LodgingImage {
    LodgingImage {
        image_id: row.get("image_id"),
        key: row.get("key"),
        is_default: row.get("is_default"),
        width: row.get::<Option<i32>, _>("width").map(|v| v as u32),
        height: row.get::<Option<i32>, _>("height").map(|v| v as u32),
        bytes: row.get("bytes"),
        mime: row.get("mime"),
        created_at: row.get("created_at"),
    }
}

fn pending_from_row(row: &PgRow) -> PendingUpload {
    PendingUpload {
        image_id: row.get("image_id"),
        staging_key: row.get("staging_key"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

/// Lock the lodging row within the current transaction. `Ok(false)` when the
/// row is missing or out of scope.
async fn lock_lodging(
    conn: &mut PgConnection,
    lodging_id: Uuid,
    scope: OwnerScope,
) -> Result<bool, AppError> {
    let row = sqlx::query(
        "SELECT id FROM lodgings WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2) FOR UPDATE",
    )
    .bind(lodging_id)
    .bind(scope.owner_id())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.is_some())
}

async fn load_lodging_media(
    conn: &mut PgConnection,
    lodging_id: Uuid,
) -> Result<LodgingMedia, AppError> {
    let image_rows = sqlx::query(
        r#"
        SELECT image_id, key, is_default, width, height, bytes, mime, created_at
        FROM lodging_images
        WHERE lodging_id = $1
        ORDER BY sort_order
        "#,
    )
    .bind(lodging_id)
    .fetch_all(&mut *conn)
    .await?;

    let pending_rows = sqlx::query(
        r#"
        SELECT image_id, staging_key, created_at, expires_at
        FROM lodging_pending_uploads
        WHERE lodging_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(lodging_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(LodgingMedia {
        images: image_rows.iter().map(image_from_row).collect(),
        pending_uploads: pending_rows.iter().map(pending_from_row).collect(),
    })
}

#[async_trait]
impl LodgingMediaStore for PgLodgingMediaStore {
    async fn find_media(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<LodgingMedia>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let owner_row = sqlx::query(
            "SELECT id FROM lodgings WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)",
        )
        .bind(lodging_id)
        .bind(scope.owner_id())
        .fetch_optional(&mut *conn)
        .await?;

        if owner_row.is_none() {
            return Ok(None);
        }

        Ok(Some(load_lodging_media(&mut conn, lodging_id).await?))
    }

    async fn try_reserve_slot(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
        max_images: usize,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        if !lock_lodging(&mut *tx, lodging_id, scope).await? {
            return Ok(false);
        }

        let counts = sqlx::query(
            r#"
            SELECT
                (SELECT count(*) FROM lodging_images WHERE lodging_id = $1) AS images,
                (SELECT count(*) FROM lodging_pending_uploads WHERE lodging_id = $1) AS pending
            "#,
        )
        .bind(lodging_id)
        .fetch_one(&mut *tx)
        .await?;
        let images: i64 = counts.get("images");
        let pending_count: i64 = counts.get("pending");

        if images + pending_count >= max_images as i64 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO lodging_pending_uploads
                (lodging_id, image_id, staging_key, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(lodging_id)
        .bind(pending.image_id)
        .bind(&pending.staging_key)
        .bind(PENDING_STATUS)
        .bind(pending.created_at)
        .bind(pending.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn try_promote_image(
        &self,
        lodging_id: Uuid,
        scope: OwnerScope,
        image: LodgingImage,
        max_images: usize,
    ) -> Result<Option<LodgingMedia>, AppError> {
        let mut tx = self.pool.begin().await?;

        if !lock_lodging(&mut *tx, lodging_id, scope).await? {
            return Ok(None);
        }

        let guard = sqlx::query(
            r#"
            SELECT
                EXISTS(
                    SELECT 1 FROM lodging_pending_uploads
                    WHERE lodging_id = $1 AND image_id = $2
                ) AS pending_exists,
                EXISTS(
                    SELECT 1 FROM lodging_images
                    WHERE lodging_id = $1 AND image_id = $2
                ) AS image_exists,
                (SELECT count(*) FROM lodging_images WHERE lodging_id = $1) AS images
            "#,
        )
        .bind(lodging_id)
        .bind(image.image_id)
        .fetch_one(&mut *tx)
        .await?;

        let pending_exists: bool = guard.get("pending_exists");
        let image_exists: bool = guard.get("image_exists");
        let images: i64 = guard.get("images");

        if !pending_exists || image_exists || images >= max_images as i64 {
            return Ok(None);
        }

        sqlx::query(
            "DELETE FROM lodging_pending_uploads WHERE lodging_id = $1 AND image_id = $2",
        )
        .bind(lodging_id)
        .bind(image.image_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO lodging_images
                (lodging_id, image_id, key, is_default, width, height, bytes, mime,
                 created_at, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM lodging_images
                 WHERE lodging_id = $1))
            "#,
        )
        .bind(lodging_id)
        .bind(image.image_id)
        .bind(&image.key)
        .bind(image.is_default)
        .bind(image.width.map(|v| v as i32))
        .bind(image.height.map(|v| v as i32))
        .bind(image.bytes)
        .bind(&image.mime)
        .bind(image.created_at)
        .execute(&mut *tx)
        .await?;

        let media = load_lodging_media(&mut *tx, lodging_id).await?;
        tx.commit().await?;
        Ok(Some(media))
    }

    async fn replace_images(
        &self,
        lodging_id: Uuid,
        images: Vec<LodgingImage>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM lodgings WHERE id = $1 FOR UPDATE")
            .bind(lodging_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Lodging not found".to_string()));
        }

        sqlx::query("DELETE FROM lodging_images WHERE lodging_id = $1")
            .bind(lodging_id)
            .execute(&mut *tx)
            .await?;

        for (sort_order, image) in images.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO lodging_images
                    (lodging_id, image_id, key, is_default, width, height, bytes, mime,
                     created_at, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(lodging_id)
            .bind(image.image_id)
            .bind(&image.key)
            .bind(image.is_default)
            .bind(image.width.map(|v| v as i32))
            .bind(image.height.map(|v| v as i32))
            .bind(image.bytes)
            .bind(&image.mime)
            .bind(image.created_at)
            .bind(sort_order as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserProfileStore {
    pool: PgPool,
}

impl PgUserProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_profile_media(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<UserProfileMedia, AppError> {
    let row = sqlx::query("SELECT profile_image FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    let profile_image = row
        .get::<Option<serde_json::Value>, _>("profile_image")
        .map(serde_json::from_value::<ProfileImage>)
        .transpose()?;

    let pending_rows = sqlx::query(
        r#"
        SELECT image_id, staging_key, created_at, expires_at
        FROM user_pending_profile_uploads
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(UserProfileMedia {
        profile_image,
        pending_uploads: pending_rows.iter().map(pending_from_row).collect(),
    })
}

#[async_trait]
impl UserProfileStore for PgUserProfileStore {
    async fn find_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
    ) -> Result<Option<UserProfileMedia>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let owner_row = sqlx::query(
            "SELECT id FROM users WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)",
        )
        .bind(user_id)
        .bind(scope.owner_id())
        .fetch_optional(&mut *conn)
        .await?;

        if owner_row.is_none() {
            return Ok(None);
        }

        Ok(Some(load_profile_media(&mut conn, user_id).await?))
    }

    async fn add_pending(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        pending: PendingUpload,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_pending_profile_uploads
                (user_id, image_id, staging_key, status, created_at, expires_at)
            SELECT u.id, $2, $3, $4, $5, $6
            FROM users u
            WHERE u.id = $1 AND ($7::uuid IS NULL OR u.owner_id = $7)
            "#,
        )
        .bind(user_id)
        .bind(pending.image_id)
        .bind(&pending.staging_key)
        .bind(PENDING_STATUS)
        .bind(pending.created_at)
        .bind(pending.expires_at)
        .bind(scope.owner_id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_promote_profile(
        &self,
        user_id: Uuid,
        scope: OwnerScope,
        image: ProfileImage,
        avatar_url: String,
    ) -> Result<Option<UserProfileMedia>, AppError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query(
            "SELECT id FROM users WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2) FOR UPDATE",
        )
        .bind(user_id)
        .bind(scope.owner_id())
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let pulled = sqlx::query(
            "DELETE FROM user_pending_profile_uploads WHERE user_id = $1 AND image_id = $2",
        )
        .bind(user_id)
        .bind(image.image_id)
        .execute(&mut *tx)
        .await?;
        if pulled.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE users SET profile_image = $2, avatar_url = $3, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(serde_json::to_value(&image)?)
            .bind(&avatar_url)
            .execute(&mut *tx)
            .await?;

        let media = load_profile_media(&mut *tx, user_id).await?;
        tx.commit().await?;
        Ok(Some(media))
    }

    async fn clear_profile(&self, user_id: Uuid, scope: OwnerScope) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET profile_image = NULL, avatar_url = NULL, updated_at = now()
            WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(scope.owner_id())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
