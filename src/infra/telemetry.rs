use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "ritaglio_views_counted_total",
            Unit::Count,
            "Views that incremented the durable counter."
        );
        describe_counter!(
            "ritaglio_views_deduped_total",
            Unit::Count,
            "Views suppressed by a live dedup window."
        );
        describe_counter!(
            "ritaglio_cache_hit_total",
            Unit::Count,
            "Response cache hits."
        );
        describe_counter!(
            "ritaglio_cache_miss_total",
            Unit::Count,
            "Response cache misses."
        );
        describe_counter!(
            "ritaglio_pastes_expired_total",
            Unit::Count,
            "Pastes transitioned to soft-deleted by the expire pass."
        );
        describe_counter!(
            "ritaglio_pastes_purged_total",
            Unit::Count,
            "Pastes permanently removed by the purge pass."
        );
        describe_counter!(
            "ritaglio_popular_cached_total",
            Unit::Count,
            "Popular pastes primed into the response cache."
        );
        describe_counter!(
            "ritaglio_notifications_sent_total",
            Unit::Count,
            "Notifications published after a fresh ledger entry."
        );
        describe_counter!(
            "ritaglio_notifications_suppressed_total",
            Unit::Count,
            "Notifications suppressed because the ledger already had the pair."
        );
        describe_counter!(
            "ritaglio_ratings_updated_total",
            Unit::Count,
            "Ratings written back by rating passes."
        );
        describe_counter!(
            "ritaglio_pass_failed_total",
            Unit::Count,
            "Scheduled pass runs that ended in a store failure."
        );
        describe_counter!(
            "ritaglio_pass_timeout_total",
            Unit::Count,
            "Scheduled pass runs cut off by the pass timeout."
        );
        describe_gauge!(
            "ritaglio_outbound_queue_len",
            Unit::Count,
            "Events waiting in the outbound queue."
        );
        describe_counter!(
            "ritaglio_outbound_dropped_total",
            Unit::Count,
            "Outbound events dropped due to queue overflow."
        );
        describe_histogram!(
            "ritaglio_pass_duration_ms",
            Unit::Milliseconds,
            "Scheduled pass duration in milliseconds."
        );
    });
}
