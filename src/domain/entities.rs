//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{
    error::DomainError,
    types::{LifecycleState, NotificationKind},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasteRecord {
    pub id: Uuid,
    pub slug: String,
    /// External short alias assigned by the hash directory; immutable once set.
    pub hash: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub author_id: Uuid,
    /// Derived 1–5 score; only authoritative immediately after a rating run.
    pub rating: i16,
    pub views_count: i64,
    pub likes_count: i64,
    pub expires_at: Option<OffsetDateTime>,
    pub is_deleted: bool,
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PasteRecord {
    /// Current lifecycle state, enforcing the soft-delete column invariant
    /// (`is_deleted = true ⇔ deleted_at` set).
    pub fn lifecycle(&self) -> Result<LifecycleState, DomainError> {
        match (self.is_deleted, self.deleted_at) {
            (false, None) => Ok(LifecycleState::Active),
            (true, Some(at)) => Ok(LifecycleState::SoftDeleted { at }),
            (false, Some(_)) | (true, None) => Err(DomainError::invariant(format!(
                "paste `{}` has inconsistent soft-delete columns",
                self.id
            ))),
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        !self.is_deleted && self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_purgeable(&self, now: OffsetDateTime, retention: Duration) -> bool {
        self.is_deleted && self.deleted_at.is_some_and(|at| at + retention <= now)
    }

    /// Expiry a restore at `now` should carry: the lifetime the paste still
    /// had left when it was soft-deleted. A paste without an expiry stays
    /// permanent.
    pub fn restored_expires_at(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        match (self.expires_at, self.deleted_at) {
            (Some(expires_at), Some(deleted_at)) => Some(now + (expires_at - deleted_at)),
            (Some(expires_at), None) => Some(expires_at),
            (None, _) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub paste_id: Uuid,
    pub reviewer_id: Uuid,
    pub grade: i16,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasteLikeRecord {
    pub id: Uuid,
    pub paste_id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// One row per (paste, kind) that has already produced an outbound
/// notification; the uniqueness of that pair is the at-most-once guarantee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentNotificationRecord {
    pub id: Uuid,
    pub paste_id: Uuid,
    pub kind: NotificationKind,
    pub sent_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample_paste() -> PasteRecord {
        PasteRecord {
            id: Uuid::new_v4(),
            slug: "sample".to_string(),
            hash: None,
            title: "Sample".to_string(),
            content: "body".to_string(),
            summary: String::new(),
            author_id: Uuid::new_v4(),
            rating: 1,
            views_count: 0,
            likes_count: 0,
            expires_at: None,
            is_deleted: false,
            deleted_at: None,
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    #[test]
    fn expiry_check_ignores_deleted_rows() {
        let now = datetime!(2025-03-01 12:00 UTC);

        let mut paste = sample_paste();
        paste.expires_at = Some(datetime!(2025-02-01 00:00 UTC));
        assert!(paste.is_expired(now));

        paste.is_deleted = true;
        paste.deleted_at = Some(now);
        assert!(!paste.is_expired(now));

        let mut permanent = sample_paste();
        permanent.expires_at = None;
        assert!(!permanent.is_expired(now));
    }

    #[test]
    fn purge_eligibility_requires_elapsed_retention() {
        let retention = Duration::days(30);
        let mut paste = sample_paste();
        paste.is_deleted = true;
        paste.deleted_at = Some(datetime!(2025-01-10 00:00 UTC));

        assert!(!paste.is_purgeable(datetime!(2025-02-01 00:00 UTC), retention));
        assert!(paste.is_purgeable(datetime!(2025-02-09 00:00 UTC), retention));

        paste.is_deleted = false;
        paste.deleted_at = None;
        assert!(!paste.is_purgeable(datetime!(2026-01-01 00:00 UTC), retention));
    }

    #[test]
    fn restore_preserves_remaining_lifetime() {
        let mut paste = sample_paste();
        paste.expires_at = Some(datetime!(2025-02-10 00:00 UTC));
        paste.is_deleted = true;
        paste.deleted_at = Some(datetime!(2025-02-03 00:00 UTC));

        let restored = paste.restored_expires_at(datetime!(2025-03-01 00:00 UTC));
        assert_eq!(restored, Some(datetime!(2025-03-08 00:00 UTC)));
    }

    #[test]
    fn restore_of_permanent_paste_stays_permanent() {
        let mut paste = sample_paste();
        paste.is_deleted = true;
        paste.deleted_at = Some(datetime!(2025-02-03 00:00 UTC));

        assert_eq!(paste.restored_expires_at(OffsetDateTime::now_utc()), None);
    }

    #[test]
    fn lifecycle_rejects_inconsistent_columns() {
        let mut paste = sample_paste();
        assert_eq!(paste.lifecycle().unwrap(), LifecycleState::Active);

        paste.is_deleted = true;
        assert!(paste.lifecycle().is_err());

        paste.deleted_at = Some(datetime!(2025-02-03 00:00 UTC));
        assert!(paste.lifecycle().unwrap().is_soft_deleted());
    }
}
