use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{LikesRepo, RepoError};
use crate::domain::entities::PasteLikeRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, FromRow)]
struct LikeRow {
    id: Uuid,
    paste_id: Uuid,
    user_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<LikeRow> for PasteLikeRecord {
    fn from(row: LikeRow) -> Self {
        PasteLikeRecord {
            id: row.id,
            paste_id: row.paste_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl LikesRepo for PostgresRepositories {
    async fn insert_like(
        &self,
        paste_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<PasteLikeRecord, RepoError> {
        let row = sqlx::query_as::<_, LikeRow>(
            "INSERT INTO paste_likes (id, paste_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, paste_id, user_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(paste_id)
        .bind(user_id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PasteLikeRecord::from(row))
    }

    async fn delete_like(&self, paste_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM paste_likes WHERE paste_id = $1 AND user_id = $2")
            .bind(paste_id)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, paste_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM paste_likes WHERE paste_id = $1 AND user_id = $2)",
        )
        .bind(paste_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
