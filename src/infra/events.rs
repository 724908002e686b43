//! Outbound event channel toward the notification and search collaborators.
//!
//! Services publish into an in-memory queue and return immediately; a
//! periodic forwarder drains the queue and POSTs each event to its endpoint.
//! The channel is fire-and-forget end to end: a failed delivery is logged and
//! dropped, never retried into the request path.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::application::outbound::{
    NotificationMessage, NotificationPublisher, SearchDocument, SearchIndexPublisher,
};

const SOURCE: &str = "infra::events";

/// How many events one forwarder flush handles at most.
const FLUSH_BATCH: usize = 64;

#[derive(Debug, Clone)]
pub enum OutboundEvent {
    Notification(NotificationMessage),
    SearchIndex(SearchDocument),
}

fn lock<'a, T>(mutex: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = SOURCE,
                result = "poisoned_recovered",
                "Recovered from poisoned outbound queue lock"
            );
            poisoned.into_inner()
        }
    }
}

/// Bounded in-memory queue. On overflow the oldest event is dropped so the
/// freshest state wins.
pub struct OutboundQueue {
    queue: Mutex<VecDeque<OutboundEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: OutboundEvent) {
        let mut queue = lock(&self.queue, "publish");
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("ritaglio_outbound_dropped_total").increment(1);
        }
        queue.push_back(event);
        metrics::gauge!("ritaglio_outbound_queue_len").set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<OutboundEvent> {
        let mut queue = lock(&self.queue, "drain");
        let count = limit.min(queue.len());
        let events = queue.drain(..count).collect();
        metrics::gauge!("ritaglio_outbound_queue_len").set(queue.len() as f64);
        events
    }

    pub fn len(&self) -> usize {
        lock(&self.queue, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NotificationPublisher for OutboundQueue {
    async fn publish(&self, message: NotificationMessage) {
        debug!(
            target: "infra::events",
            recipient = %message.recipient,
            kind = message.kind.as_str(),
            "notification enqueued"
        );
        OutboundQueue::publish(self, OutboundEvent::Notification(message));
    }
}

#[async_trait]
impl SearchIndexPublisher for OutboundQueue {
    async fn publish(&self, document: SearchDocument) {
        debug!(
            target: "infra::events",
            paste_id = %document.id,
            is_deleted = document.is_deleted,
            "search index snapshot enqueued"
        );
        OutboundQueue::publish(self, OutboundEvent::SearchIndex(document));
    }
}

/// Periodically drains the queue and delivers each event to its endpoint.
pub struct OutboundForwarder {
    queue: Arc<OutboundQueue>,
    http: Client,
    notification_url: Option<Url>,
    search_index_url: Option<Url>,
}

impl OutboundForwarder {
    pub fn new(
        queue: Arc<OutboundQueue>,
        http: Client,
        notification_url: Option<Url>,
        search_index_url: Option<Url>,
    ) -> Self {
        Self {
            queue,
            http,
            notification_url,
            search_index_url,
        }
    }

    /// Deliver one batch. Called from the forwarder loop.
    pub async fn flush(&self) {
        for event in self.queue.drain(FLUSH_BATCH) {
            match event {
                OutboundEvent::Notification(message) => {
                    self.deliver(self.notification_url.as_ref(), "notification", &message)
                        .await;
                }
                OutboundEvent::SearchIndex(document) => {
                    self.deliver(self.search_index_url.as_ref(), "search-index", &document)
                        .await;
                }
            }
        }
    }

    async fn deliver<T: Serialize>(&self, url: Option<&Url>, channel: &'static str, payload: &T) {
        let Some(url) = url else {
            debug!(
                target: "infra::events",
                channel,
                "no endpoint configured; event dropped"
            );
            return;
        };

        match self.http.post(url.clone()).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(target: "infra::events", channel, "event delivered");
            }
            Ok(response) => warn!(
                target: "infra::events",
                channel,
                status = response.status().as_u16(),
                "collaborator rejected event; dropped"
            ),
            Err(err) => warn!(
                target: "infra::events",
                channel,
                error = %err,
                "event delivery failed; dropped"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use uuid::Uuid;

    use crate::domain::types::NotificationKind;

    use super::*;

    fn sample_notification() -> OutboundEvent {
        OutboundEvent::Notification(NotificationMessage {
            recipient: Uuid::new_v4(),
            kind: NotificationKind::PopularityReached,
            fields: BTreeMap::new(),
        })
    }

    #[test]
    fn publish_and_drain_fifo() {
        let queue = OutboundQueue::new(8);

        queue.publish(sample_notification());
        queue.publish(sample_notification());
        assert_eq!(queue.len(), 2);

        let drained = queue.drain(1);
        assert_eq!(drained.len(), 1);
        assert_eq!(queue.len(), 1);

        let rest = queue.drain(100);
        assert_eq!(rest.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = OutboundQueue::new(2);

        queue.publish(sample_notification());
        queue.publish(sample_notification());
        queue.publish(sample_notification());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn queue_recovers_from_poisoned_lock() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let queue = OutboundQueue::new(8);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(sample_notification());
        assert_eq!(queue.len(), 1);
    }
}
