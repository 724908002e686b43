//! In-process TTL-bound stores backing the response cache and the view
//! ledger.
//!
//! Entries carry their own deadline and are dropped lazily on access, so an
//! expired key behaves exactly like an absent one without a sweeper task.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::types::VisitorIdentity;

use super::keys::view_key;
use super::{ResponseCache, ViewLedger};

struct TtlEntry {
    value: String,
    expires_at: Instant,
}

impl TtlEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// String-keyed map whose entries vanish after their TTL.
struct TtlMap {
    entries: DashMap<String, TtlEntry>,
}

impl TtlMap {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        // The shard guard must be released before removing the entry.
        let (value, expired) = match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => (None, true),
            Some(entry) => (Some(entry.value.clone()), false),
            None => (None, false),
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }

        value
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn insert(&self, key: String, value: String, ttl: Duration) {
        self.entries.insert(
            key,
            TtlEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// TTL response cache for denormalized paste snapshots.
pub struct MemoryResponseCache {
    map: TtlMap,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self { map: TtlMap::new() }
    }
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, key: &str) -> Option<String> {
        let hit = self.map.get(key);
        if hit.is_some() {
            metrics::counter!("ritaglio_cache_hit_total").increment(1);
        } else {
            metrics::counter!("ritaglio_cache_miss_total").increment(1);
        }
        hit
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        self.map.insert(key.to_string(), value.to_string(), ttl);
    }

    async fn exists(&self, key: &str) -> bool {
        self.map.contains(key)
    }

    async fn delete(&self, key: &str) {
        self.map.remove(key);
    }
}

/// TTL dedup set marking which visitor already had a view counted.
pub struct MemoryViewLedger {
    map: TtlMap,
}

impl MemoryViewLedger {
    pub fn new() -> Self {
        Self { map: TtlMap::new() }
    }
}

impl Default for MemoryViewLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViewLedger for MemoryViewLedger {
    async fn already_counted(&self, visitor: &VisitorIdentity, paste_id: Uuid) -> bool {
        self.map.contains(&view_key(visitor, paste_id))
    }

    async fn mark_counted(&self, visitor: &VisitorIdentity, paste_id: Uuid, window: Duration) {
        self.map
            .insert(view_key(visitor, paste_id), "counted".to_string(), window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_TTL: Duration = Duration::from_millis(20);
    const LONG_TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn response_cache_roundtrip() {
        let cache = MemoryResponseCache::new();

        assert!(cache.get("paste:a").await.is_none());
        assert!(!cache.exists("paste:a").await);

        cache.set_with_ttl("paste:a", "{\"id\":1}", LONG_TTL).await;

        assert!(cache.exists("paste:a").await);
        assert_eq!(cache.get("paste:a").await.as_deref(), Some("{\"id\":1}"));

        cache.delete("paste:a").await;
        assert!(cache.get("paste:a").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = MemoryResponseCache::new();
        cache.set_with_ttl("paste:b", "v", SHORT_TTL).await;
        assert!(cache.exists("paste:b").await);

        tokio::time::sleep(SHORT_TTL * 2).await;

        assert!(!cache.exists("paste:b").await);
        assert!(cache.get("paste:b").await.is_none());
    }

    #[tokio::test]
    async fn view_ledger_marks_within_window() {
        let ledger = MemoryViewLedger::new();
        let paste_id = Uuid::new_v4();
        let visitor = VisitorIdentity::User(Uuid::new_v4());

        assert!(!ledger.already_counted(&visitor, paste_id).await);

        ledger.mark_counted(&visitor, paste_id, LONG_TTL).await;
        assert!(ledger.already_counted(&visitor, paste_id).await);

        // A different paste or visitor is unaffected.
        assert!(!ledger.already_counted(&visitor, Uuid::new_v4()).await);
        let other = VisitorIdentity::Ip("10.0.0.9".parse().unwrap());
        assert!(!ledger.already_counted(&other, paste_id).await);
    }

    #[tokio::test]
    async fn view_ledger_window_elapses() {
        let ledger = MemoryViewLedger::new();
        let paste_id = Uuid::new_v4();
        let visitor = VisitorIdentity::Ip("203.0.113.9".parse().unwrap());

        ledger.mark_counted(&visitor, paste_id, SHORT_TTL).await;
        assert!(ledger.already_counted(&visitor, paste_id).await);

        tokio::time::sleep(SHORT_TTL * 2).await;
        assert!(!ledger.already_counted(&visitor, paste_id).await);
    }
}
