//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{PasteLikeRecord, PasteRecord, ReviewRecord};
use crate::domain::rating::RatingBases;
use crate::domain::types::NotificationKind;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CreatePasteParams {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub author_id: Uuid,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait PastesRepo: Send + Sync {
    async fn find_live_by_id(&self, id: Uuid) -> Result<Option<PasteRecord>, RepoError>;

    async fn find_live_by_slug(&self, slug: &str) -> Result<Option<PasteRecord>, RepoError>;

    async fn find_live_by_hash(&self, hash: &str) -> Result<Option<PasteRecord>, RepoError>;

    async fn find_deleted_by_id(&self, id: Uuid) -> Result<Option<PasteRecord>, RepoError>;

    /// Author of a live paste, for the self-view exclusion check.
    async fn find_author(&self, id: Uuid) -> Result<Option<Uuid>, RepoError>;

    async fn list_live_by_author(&self, author_id: Uuid) -> Result<Vec<PasteRecord>, RepoError>;

    async fn list_deleted_by_author(
        &self,
        author_id: Uuid,
    ) -> Result<Vec<PasteRecord>, RepoError>;

    /// Live pastes whose expiry has passed, in expiry order.
    async fn select_expired(&self, now: OffsetDateTime) -> Result<Vec<PasteRecord>, RepoError>;

    /// Soft-deleted pastes whose `deleted_at` is at or before `threshold`.
    async fn select_purgeable(
        &self,
        threshold: OffsetDateTime,
    ) -> Result<Vec<PasteRecord>, RepoError>;

    /// Live pastes at or above the popularity view threshold.
    async fn select_popular(&self, min_views: i64) -> Result<Vec<PasteRecord>, RepoError>;

    /// All live pastes, for the rating pass.
    async fn list_live(&self) -> Result<Vec<PasteRecord>, RepoError>;

    /// Maximum like and view counts across live pastes.
    async fn rating_bases(&self) -> Result<RatingBases, RepoError>;
}

#[async_trait]
pub trait PastesWriteRepo: Send + Sync {
    async fn create_paste(&self, params: CreatePasteParams) -> Result<PasteRecord, RepoError>;

    /// Record the external hash alias; a no-op once one is assigned.
    async fn assign_hash(&self, id: Uuid, hash: &str) -> Result<(), RepoError>;

    /// Manual soft delete from the request path; `NotFound` when the paste is
    /// missing or already deleted.
    async fn soft_delete(&self, id: Uuid, now: OffsetDateTime) -> Result<PasteRecord, RepoError>;

    /// Clear the soft-delete marker and install the recomputed expiry;
    /// `NotFound` when the paste is not currently soft-deleted.
    async fn restore(
        &self,
        id: Uuid,
        expires_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Result<PasteRecord, RepoError>;

    /// Expiry-driven soft delete. Guarded so re-running the expire pass and
    /// racing request-path deletes are no-ops; returns whether this call
    /// performed the transition.
    async fn mark_expired(&self, id: Uuid, now: OffsetDateTime) -> Result<bool, RepoError>;

    /// Physically remove a soft-deleted paste and its dependent rows.
    /// Returns whether a row was removed.
    async fn purge(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Store-side `views_count = views_count + 1`.
    async fn increment_views(&self, id: Uuid) -> Result<(), RepoError>;

    /// Store-side `likes_count = likes_count + delta` (delta is ±1).
    async fn increment_likes(&self, id: Uuid, delta: i64) -> Result<(), RepoError>;

    /// Write recomputed ratings back as one batch.
    async fn write_ratings(&self, ratings: &[(Uuid, i16)]) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ReviewsRepo: Send + Sync {
    async fn insert_review(
        &self,
        paste_id: Uuid,
        reviewer_id: Uuid,
        grade: i16,
        now: OffsetDateTime,
    ) -> Result<ReviewRecord, RepoError>;

    async fn list_for_paste(&self, paste_id: Uuid) -> Result<Vec<ReviewRecord>, RepoError>;

    async fn delete_review(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Mean grade over all reviews of a paste, `None` when unreviewed.
    async fn average_grade(&self, paste_id: Uuid) -> Result<Option<f64>, RepoError>;
}

#[async_trait]
pub trait LikesRepo: Send + Sync {
    /// `Duplicate` when the user already likes the paste.
    async fn insert_like(
        &self,
        paste_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<PasteLikeRecord, RepoError>;

    async fn delete_like(&self, paste_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;

    async fn exists(&self, paste_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
}

/// Durable ledger of already-sent notifications, keyed by (paste, kind).
///
/// `record_fired` relies on a database unique constraint: losing the
/// check-then-insert race surfaces as `RepoError::Duplicate`, which callers
/// treat as "someone else already sent it".
#[async_trait]
pub trait NotificationLedgerRepo: Send + Sync {
    async fn has_fired(&self, paste_id: Uuid, kind: NotificationKind) -> Result<bool, RepoError>;

    async fn record_fired(
        &self,
        paste_id: Uuid,
        kind: NotificationKind,
        when: OffsetDateTime,
    ) -> Result<(), RepoError>;
}
