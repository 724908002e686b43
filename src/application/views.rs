//! Request-path view counting with per-visitor deduplication.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::application::{
    error::AppError,
    repos::{PastesRepo, PastesWriteRepo},
};
use crate::cache::ViewLedger;
use crate::domain::types::VisitorIdentity;

/// What happened to a single view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The durable counter was incremented and the dedup window opened.
    Counted,
    /// The visitor already has a live dedup entry for this paste.
    AlreadyCounted,
    /// Authors reading their own paste are never counted.
    SelfView,
}

/// Decides on every read whether the durable view counter moves.
///
/// The check-then-act sequence against the ledger is deliberately not atomic;
/// two simultaneous first views from one visitor can both count. That skew is
/// bounded and cosmetic.
pub struct ViewService {
    pastes: Arc<dyn PastesRepo>,
    writes: Arc<dyn PastesWriteRepo>,
    ledger: Arc<dyn ViewLedger>,
    dedup_window: Duration,
}

impl ViewService {
    pub fn new(
        pastes: Arc<dyn PastesRepo>,
        writes: Arc<dyn PastesWriteRepo>,
        ledger: Arc<dyn ViewLedger>,
        dedup_window: Duration,
    ) -> Self {
        Self {
            pastes,
            writes,
            ledger,
            dedup_window,
        }
    }

    pub async fn record_view(
        &self,
        paste_id: Uuid,
        visitor: &VisitorIdentity,
    ) -> Result<ViewOutcome, AppError> {
        if let VisitorIdentity::User(user_id) = visitor {
            let author = self.pastes.find_author(paste_id).await?;
            if author.is_some_and(|author_id| author_id == *user_id) {
                return Ok(ViewOutcome::SelfView);
            }
        }

        if self.ledger.already_counted(visitor, paste_id).await {
            metrics::counter!("ritaglio_views_deduped_total").increment(1);
            return Ok(ViewOutcome::AlreadyCounted);
        }

        self.writes.increment_views(paste_id).await?;
        self.ledger
            .mark_counted(visitor, paste_id, self.dedup_window)
            .await;

        metrics::counter!("ritaglio_views_counted_total").increment(1);
        debug!(
            target: "application::views",
            paste_id = %paste_id,
            visitor = ?visitor,
            "view counted"
        );

        Ok(ViewOutcome::Counted)
    }
}
