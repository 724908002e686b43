use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{NotificationLedgerRepo, RepoError};
use crate::domain::types::NotificationKind;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl NotificationLedgerRepo for PostgresRepositories {
    async fn has_fired(&self, paste_id: Uuid, kind: NotificationKind) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sent_notifications WHERE paste_id = $1 AND kind = $2)",
        )
        .bind(paste_id)
        .bind(kind)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    /// The unique index on (paste_id, kind) turns a lost race into
    /// `RepoError::Duplicate`; callers suppress the outbound event on that.
    async fn record_fired(
        &self,
        paste_id: Uuid,
        kind: NotificationKind,
        when: OffsetDateTime,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO sent_notifications (id, paste_id, kind, sent_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(paste_id)
        .bind(kind)
        .bind(when)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(map_sqlx_error)
    }
}
