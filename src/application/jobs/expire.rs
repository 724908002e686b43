//! Expire pass: transition pastes past their expiry to soft-deleted.

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::application::{notify::fire_once, outbound::SearchDocument, repos::RepoError};
use crate::domain::types::NotificationKind;

use super::context::PassContext;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpireOutcome {
    /// Rows this run moved from active to soft-deleted.
    pub transitioned: u64,
    /// Expiration notifications this run actually published.
    pub notified: u64,
}

/// Soft-delete every live paste whose expiry has passed.
///
/// The state transition is the authoritative outcome; notification and hash
/// retirement are best effort and never block it. Store failures abort the
/// run and the next scheduled invocation re-selects from scratch.
pub async fn run_expire_pass(
    ctx: &PassContext,
    now: OffsetDateTime,
) -> Result<ExpireOutcome, RepoError> {
    let expired = ctx.pastes.select_expired(now).await?;
    if expired.is_empty() {
        debug!(target: "application::jobs::expire", "no expired pastes");
        return Ok(ExpireOutcome::default());
    }

    info!(
        target: "application::jobs::expire",
        candidates = expired.len(),
        "expiring pastes"
    );

    let mut outcome = ExpireOutcome::default();
    for paste in expired {
        match fire_once(
            ctx.ledger.as_ref(),
            ctx.notifications.as_ref(),
            &paste,
            NotificationKind::ExpirationWarning,
            now,
        )
        .await
        {
            Ok(true) => outcome.notified += 1,
            Ok(false) => {}
            Err(err) => warn!(
                target: "application::jobs::expire",
                paste_id = %paste.id,
                error = %err,
                "expiration notification failed; transition proceeds"
            ),
        }

        if let Err(err) = ctx.hashes.mark_deleted(paste.id).await {
            warn!(
                target: "application::jobs::expire",
                paste_id = %paste.id,
                error = %err,
                "hash directory delete failed"
            );
        }

        if ctx.writes.mark_expired(paste.id, now).await? {
            outcome.transitioned += 1;
            metrics::counter!("ritaglio_pastes_expired_total").increment(1);

            let mut document = SearchDocument::from(&paste);
            document.is_deleted = true;
            ctx.search.publish(document).await;
        } else {
            // Vanished or already transitioned between selection and update.
            debug!(
                target: "application::jobs::expire",
                paste_id = %paste.id,
                "paste already handled; skipping"
            );
        }
    }

    info!(
        target: "application::jobs::expire",
        transitioned = outcome.transitioned,
        notified = outcome.notified,
        "expire pass finished"
    );
    Ok(outcome)
}
