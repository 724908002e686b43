//! Purge pass: permanently remove pastes soft-deleted past the retention
//! window.

use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::application::repos::RepoError;
use crate::cache::paste_key;

use super::context::PassContext;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub purged: u64,
    /// Rows whose delete failed this run; the next run re-selects them.
    pub failed: u64,
}

/// Remove every paste whose `deleted_at` is older than the retention window,
/// together with its ledger, review, and like rows.
///
/// Purging is idempotent: re-selecting already-purged rows yields nothing,
/// and a row that fails to delete is simply picked up again next run.
pub async fn run_purge_pass(
    ctx: &PassContext,
    now: OffsetDateTime,
) -> Result<PurgeOutcome, RepoError> {
    let threshold = now - ctx.tuning.retention_window;
    let candidates = ctx.pastes.select_purgeable(threshold).await?;
    if candidates.is_empty() {
        debug!(target: "application::jobs::purge", "nothing to purge");
        return Ok(PurgeOutcome::default());
    }

    info!(
        target: "application::jobs::purge",
        candidates = candidates.len(),
        "purging pastes past retention"
    );

    let mut outcome = PurgeOutcome::default();
    for paste in candidates {
        match ctx.writes.purge(paste.id).await {
            Ok(true) => {
                outcome.purged += 1;
                metrics::counter!("ritaglio_pastes_purged_total").increment(1);
                // A stale popular snapshot must not outlive the row.
                ctx.cache.delete(&paste_key(paste.id)).await;
            }
            Ok(false) => debug!(
                target: "application::jobs::purge",
                paste_id = %paste.id,
                "paste already purged or restored; skipping"
            ),
            Err(err) => {
                outcome.failed += 1;
                error!(
                    target: "application::jobs::purge",
                    paste_id = %paste.id,
                    error = %err,
                    "purge failed; will retry next run"
                );
            }
        }
    }

    info!(
        target: "application::jobs::purge",
        purged = outcome.purged,
        failed = outcome.failed,
        "purge pass finished"
    );
    Ok(outcome)
}
