use std::sync::Arc;
use std::time::Duration as StdDuration;

use time::Duration;

use crate::application::{
    outbound::{HashDirectory, NotificationPublisher, SearchIndexPublisher},
    repos::{NotificationLedgerRepo, PastesRepo, PastesWriteRepo, ReviewsRepo},
};
use crate::cache::ResponseCache;

/// Knobs shared by the background passes.
#[derive(Debug, Clone, Copy)]
pub struct EngineTuning {
    /// View count at which a paste becomes popular.
    pub popularity_threshold: i64,
    /// TTL of cache entries primed by the popularity pass.
    pub popular_cache_ttl: StdDuration,
    /// How long a soft-deleted paste survives before the purge pass may
    /// remove it.
    pub retention_window: Duration,
}

/// Shared context handed to every pass so they can reach storage, the cache,
/// and the outbound channels.
#[derive(Clone)]
pub struct PassContext {
    pub pastes: Arc<dyn PastesRepo>,
    pub writes: Arc<dyn PastesWriteRepo>,
    pub reviews: Arc<dyn ReviewsRepo>,
    pub ledger: Arc<dyn NotificationLedgerRepo>,
    pub cache: Arc<dyn ResponseCache>,
    pub notifications: Arc<dyn NotificationPublisher>,
    pub search: Arc<dyn SearchIndexPublisher>,
    pub hashes: Arc<dyn HashDirectory>,
    pub tuning: EngineTuning,
}
