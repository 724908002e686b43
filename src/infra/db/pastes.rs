use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreatePasteParams, PastesRepo, PastesWriteRepo, RepoError};
use crate::domain::entities::PasteRecord;
use crate::domain::rating::RatingBases;

use super::{PostgresRepositories, map_sqlx_error};

const PASTE_COLUMNS: &str = "id, slug, hash, title, content, summary, author_id, rating, \
     views_count, likes_count, expires_at, is_deleted, deleted_at, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PasteRow {
    id: Uuid,
    slug: String,
    hash: Option<String>,
    title: String,
    content: String,
    summary: String,
    author_id: Uuid,
    rating: i16,
    views_count: i64,
    likes_count: i64,
    expires_at: Option<OffsetDateTime>,
    is_deleted: bool,
    deleted_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PasteRow> for PasteRecord {
    fn from(row: PasteRow) -> Self {
        PasteRecord {
            id: row.id,
            slug: row.slug,
            hash: row.hash,
            title: row.title,
            content: row.content,
            summary: row.summary,
            author_id: row.author_id,
            rating: row.rating,
            views_count: row.views_count,
            likes_count: row.likes_count,
            expires_at: row.expires_at,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn into_records(rows: Vec<PasteRow>) -> Vec<PasteRecord> {
    rows.into_iter().map(PasteRecord::from).collect()
}

#[async_trait]
impl PastesRepo for PostgresRepositories {
    async fn find_live_by_id(&self, id: Uuid) -> Result<Option<PasteRecord>, RepoError> {
        let sql = format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE id = $1 AND is_deleted = FALSE");
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(PasteRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_live_by_slug(&self, slug: &str) -> Result<Option<PasteRecord>, RepoError> {
        let sql =
            format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE slug = $1 AND is_deleted = FALSE");
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(PasteRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_live_by_hash(&self, hash: &str) -> Result<Option<PasteRecord>, RepoError> {
        let sql =
            format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE hash = $1 AND is_deleted = FALSE");
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(hash)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(PasteRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_deleted_by_id(&self, id: Uuid) -> Result<Option<PasteRecord>, RepoError> {
        let sql = format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE id = $1 AND is_deleted = TRUE");
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(PasteRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_author(&self, id: Uuid) -> Result<Option<Uuid>, RepoError> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT author_id FROM pastes WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_live_by_author(&self, author_id: Uuid) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!(
            "SELECT {PASTE_COLUMNS} FROM pastes \
             WHERE author_id = $1 AND is_deleted = FALSE ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(author_id)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn list_deleted_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!(
            "SELECT {PASTE_COLUMNS} FROM pastes \
             WHERE author_id = $1 AND is_deleted = TRUE ORDER BY deleted_at DESC"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(author_id)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn select_expired(&self, now: OffsetDateTime) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!(
            "SELECT {PASTE_COLUMNS} FROM pastes \
             WHERE is_deleted = FALSE AND expires_at IS NOT NULL AND expires_at <= $1 \
             ORDER BY expires_at"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(now)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn select_purgeable(
        &self,
        threshold: OffsetDateTime,
    ) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!(
            "SELECT {PASTE_COLUMNS} FROM pastes \
             WHERE is_deleted = TRUE AND deleted_at <= $1 ORDER BY deleted_at"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(threshold)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn select_popular(&self, min_views: i64) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!(
            "SELECT {PASTE_COLUMNS} FROM pastes \
             WHERE is_deleted = FALSE AND views_count >= $1 ORDER BY views_count DESC"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(min_views)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn list_live(&self) -> Result<Vec<PasteRecord>, RepoError> {
        let sql = format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE is_deleted = FALSE");
        sqlx::query_as::<_, PasteRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map(into_records)
            .map_err(map_sqlx_error)
    }

    async fn rating_bases(&self) -> Result<RatingBases, RepoError> {
        let (max_likes, max_views) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COALESCE(MAX(likes_count), 0), COALESCE(MAX(views_count), 0) \
             FROM pastes WHERE is_deleted = FALSE",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(RatingBases {
            max_likes,
            max_views,
        })
    }
}

#[async_trait]
impl PastesWriteRepo for PostgresRepositories {
    async fn create_paste(&self, params: CreatePasteParams) -> Result<PasteRecord, RepoError> {
        let CreatePasteParams {
            slug,
            title,
            content,
            summary,
            author_id,
            expires_at,
        } = params;

        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO pastes ( \
                 id, slug, title, content, summary, author_id, expires_at, created_at, updated_at \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {PASTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PasteRow>(&sql)
            .bind(id)
            .bind(slug)
            .bind(title)
            .bind(content)
            .bind(summary)
            .bind(author_id)
            .bind(expires_at)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PasteRecord::from(row))
    }

    async fn assign_hash(&self, id: Uuid, hash: &str) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE pastes SET hash = $2, updated_at = now() WHERE id = $1 AND hash IS NULL",
        )
        .bind(id)
        .bind(hash)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
    }

    async fn soft_delete(&self, id: Uuid, now: OffsetDateTime) -> Result<PasteRecord, RepoError> {
        let sql = format!(
            "UPDATE pastes \
                SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 \
              WHERE id = $1 AND is_deleted = FALSE \
              RETURNING {PASTE_COLUMNS}"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(PasteRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn restore(
        &self,
        id: Uuid,
        expires_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Result<PasteRecord, RepoError> {
        let sql = format!(
            "UPDATE pastes \
                SET is_deleted = FALSE, deleted_at = NULL, expires_at = $2, updated_at = $3 \
              WHERE id = $1 AND is_deleted = TRUE \
              RETURNING {PASTE_COLUMNS}"
        );
        sqlx::query_as::<_, PasteRow>(&sql)
            .bind(id)
            .bind(expires_at)
            .bind(now)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(PasteRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn mark_expired(&self, id: Uuid, now: OffsetDateTime) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE pastes \
                SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 \
              WHERE id = $1 AND is_deleted = FALSE AND expires_at <= $2",
        )
        .bind(id)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge(&self, id: Uuid) -> Result<bool, RepoError> {
        // Dependent ledger, review, and like rows go with the paste via
        // ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM pastes WHERE id = $1 AND is_deleted = TRUE")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE pastes SET views_count = views_count + 1 WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
    }

    async fn increment_likes(&self, id: Uuid, delta: i64) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE pastes SET likes_count = GREATEST(likes_count + $2, 0) \
              WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(delta)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
    }

    async fn write_ratings(&self, ratings: &[(Uuid, i16)]) -> Result<u64, RepoError> {
        if ratings.is_empty() {
            return Ok(0);
        }

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let mut written = 0u64;
        for (id, rating) in ratings {
            let result =
                sqlx::query("UPDATE pastes SET rating = $2 WHERE id = $1 AND is_deleted = FALSE")
                    .bind(id)
                    .bind(rating)
                    .execute(tx.as_mut())
                    .await
                    .map_err(map_sqlx_error)?;
            written += result.rows_affected();
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(written)
    }
}
