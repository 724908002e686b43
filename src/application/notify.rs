//! Check-then-insert-then-publish: the shared at-most-once notification
//! pattern used by the expire and popularity passes.

use time::OffsetDateTime;
use tracing::debug;

use crate::application::{
    outbound::{NotificationMessage, NotificationPublisher},
    repos::{NotificationLedgerRepo, RepoError},
};
use crate::domain::{entities::PasteRecord, types::NotificationKind};

/// Publish `kind` for `paste` unless the ledger already holds an entry for
/// the pair. Returns whether this call published.
///
/// The existence check is an optimization; the unique constraint behind
/// `record_fired` is what actually closes the race, so a `Duplicate` result
/// means another pass won and the event is suppressed. Inserting before
/// publishing means a crash in between drops the notification instead of
/// ever duplicating it.
pub async fn fire_once(
    ledger: &dyn NotificationLedgerRepo,
    notifications: &dyn NotificationPublisher,
    paste: &PasteRecord,
    kind: NotificationKind,
    now: OffsetDateTime,
) -> Result<bool, RepoError> {
    if ledger.has_fired(paste.id, kind).await? {
        return Ok(false);
    }

    match ledger.record_fired(paste.id, kind, now).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            debug!(
                target: "application::notify",
                paste_id = %paste.id,
                kind = kind.as_str(),
                "notification already recorded by a concurrent pass"
            );
            metrics::counter!("ritaglio_notifications_suppressed_total").increment(1);
            return Ok(false);
        }
        Err(err) => return Err(err),
    }

    notifications
        .publish(NotificationMessage::for_paste(paste, kind))
        .await;
    metrics::counter!("ritaglio_notifications_sent_total").increment(1);

    Ok(true)
}
