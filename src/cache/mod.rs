//! TTL-bound cache contracts consumed by the engine.
//!
//! Two primitives: a response cache holding denormalized paste snapshots and
//! a view ledger deduplicating visitor views. Both are specified as traits so
//! deployments can point them at an external cache; the bundled
//! implementations live in [`store`] and keep everything in process memory.

mod keys;
mod store;

pub use keys::{paste_key, view_key};
pub use store::{MemoryResponseCache, MemoryViewLedger};

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::types::VisitorIdentity;

/// Read-through cache of rendered paste responses, keyed by paste id.
///
/// Entries may be stale relative to the store by up to their TTL; the
/// popularity pass is the only writer that primes them.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration);

    async fn exists(&self, key: &str) -> bool;

    async fn delete(&self, key: &str);
}

/// Dedup set over (visitor, paste) pairs.
///
/// While an entry exists no further view of that pair is counted; entries
/// expire after the configured window.
#[async_trait]
pub trait ViewLedger: Send + Sync {
    async fn already_counted(&self, visitor: &VisitorIdentity, paste_id: Uuid) -> bool;

    async fn mark_counted(&self, visitor: &VisitorIdentity, paste_id: Uuid, window: Duration);
}
