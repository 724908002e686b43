//! Popularity pass: prime the response cache for heavily viewed pastes and
//! send the one-time popularity notification.

use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::application::{
    notify::fire_once, pastes::PasteResponse, repos::RepoError,
};
use crate::cache::paste_key;
use crate::domain::types::NotificationKind;

use super::context::PassContext;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopularityOutcome {
    /// Cache entries primed this run.
    pub cached: u64,
    /// Popularity notifications published this run.
    pub notified: u64,
    /// Per-item failures that were logged and skipped.
    pub failures: u64,
}

/// Cache and announce every live paste at or above the view threshold.
///
/// An existing cache entry is left alone so the pass never refreshes its own
/// TTL; staleness stays bounded by the entry's lifetime. Per-item failures
/// are logged and the batch continues.
pub async fn run_popularity_pass(
    ctx: &PassContext,
    now: OffsetDateTime,
) -> Result<PopularityOutcome, RepoError> {
    let popular = ctx
        .pastes
        .select_popular(ctx.tuning.popularity_threshold)
        .await?;
    if popular.is_empty() {
        debug!(target: "application::jobs::popularity", "no popular pastes");
        return Ok(PopularityOutcome::default());
    }

    info!(
        target: "application::jobs::popularity",
        candidates = popular.len(),
        threshold = ctx.tuning.popularity_threshold,
        "processing popular pastes"
    );

    let mut outcome = PopularityOutcome::default();
    for paste in popular {
        let key = paste_key(paste.id);
        if ctx.cache.exists(&key).await {
            debug!(
                target: "application::jobs::popularity",
                paste_id = %paste.id,
                "already cached; leaving TTL untouched"
            );
        } else {
            match serde_json::to_string(&PasteResponse::from(&paste)) {
                Ok(body) => {
                    ctx.cache
                        .set_with_ttl(&key, &body, ctx.tuning.popular_cache_ttl)
                        .await;
                    outcome.cached += 1;
                    metrics::counter!("ritaglio_popular_cached_total").increment(1);
                }
                Err(err) => {
                    outcome.failures += 1;
                    error!(
                        target: "application::jobs::popularity",
                        paste_id = %paste.id,
                        error = %err,
                        "failed to serialize popular paste; skipping cache priming"
                    );
                }
            }
        }

        // Notification is decided independently of the caching outcome.
        match fire_once(
            ctx.ledger.as_ref(),
            ctx.notifications.as_ref(),
            &paste,
            NotificationKind::PopularityReached,
            now,
        )
        .await
        {
            Ok(true) => outcome.notified += 1,
            Ok(false) => {}
            Err(err) => {
                outcome.failures += 1;
                error!(
                    target: "application::jobs::popularity",
                    paste_id = %paste.id,
                    error = %err,
                    "popularity notification failed; continuing with remaining pastes"
                );
            }
        }
    }

    info!(
        target: "application::jobs::popularity",
        cached = outcome.cached,
        notified = outcome.notified,
        failures = outcome.failures,
        "popularity pass finished"
    );
    Ok(outcome)
}
