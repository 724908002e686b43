use async_trait::async_trait;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, ReviewsRepo};
use crate::domain::entities::ReviewRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    paste_id: Uuid,
    reviewer_id: Uuid,
    grade: i16,
    created_at: OffsetDateTime,
}

impl From<ReviewRow> for ReviewRecord {
    fn from(row: ReviewRow) -> Self {
        ReviewRecord {
            id: row.id,
            paste_id: row.paste_id,
            reviewer_id: row.reviewer_id,
            grade: row.grade,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ReviewsRepo for PostgresRepositories {
    async fn insert_review(
        &self,
        paste_id: Uuid,
        reviewer_id: Uuid,
        grade: i16,
        now: OffsetDateTime,
    ) -> Result<ReviewRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "INSERT INTO reviews (id, paste_id, reviewer_id, grade, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, paste_id, reviewer_id, grade, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(paste_id)
        .bind(reviewer_id)
        .bind(grade)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ReviewRecord::from(row))
    }

    async fn list_for_paste(&self, paste_id: Uuid) -> Result<Vec<ReviewRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, paste_id, reviewer_id, grade, created_at \
             FROM reviews WHERE paste_id = $1 ORDER BY created_at DESC",
        )
        .bind(paste_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReviewRecord::from).collect())
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn average_grade(&self, paste_id: Uuid) -> Result<Option<f64>, RepoError> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(grade)::DOUBLE PRECISION FROM reviews WHERE paste_id = $1",
        )
        .bind(paste_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
