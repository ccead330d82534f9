//! Subscription registry
//!
//! The broker's routing table: every live subscriber connection is one entry,
//! keyed by its session id. `relay` walks the table once per envelope and
//! queues the envelope to each subscription whose filter matches the topic.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::envelope::{Envelope, TopicFilter};
use crate::stats::BrokerStats;

/// One registered subscriber connection.
struct Subscription {
    filter: TopicFilter,
    /// Bounded delivery queue. The broadcast ring holds at most
    /// `queue_capacity` envelopes; a receiver that falls further behind loses
    /// the oldest entries (reported as lag on its next `recv`), so a slow
    /// subscriber costs bounded memory and never blocks relay.
    tx: broadcast::Sender<Envelope>,
}

/// Registry of active subscriptions.
///
/// Thread-safe via `RwLock`: relay takes the read lock (the hot path, shared
/// across all producer connections), registration changes take the write
/// lock.
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<u64, Subscription>>,
    queue_capacity: usize,
    stats: Arc<BrokerStats>,
}

impl SubscriptionRegistry {
    /// Create a registry whose subscriptions queue up to `queue_capacity`
    /// undelivered envelopes each.
    pub fn new(queue_capacity: usize, stats: Arc<BrokerStats>) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
            stats,
        }
    }

    /// Register a subscriber connection and get its delivery queue.
    pub async fn register(
        &self,
        session_id: u64,
        filter: TopicFilter,
    ) -> broadcast::Receiver<Envelope> {
        let (tx, rx) = broadcast::channel(self.queue_capacity);

        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(session_id, Subscription { filter: filter.clone(), tx });
        self.stats.subscriber_registered();

        tracing::info!(
            session_id,
            filter = %filter,
            subscribers = subscriptions.len(),
            "Subscriber registered"
        );

        rx
    }

    /// Remove a subscription. Safe to call for an id that is already gone.
    pub async fn deregister(&self, session_id: u64) {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.remove(&session_id).is_some() {
            self.stats.subscriber_removed();
            tracing::info!(
                session_id,
                subscribers = subscriptions.len(),
                "Subscriber removed"
            );
        }
    }

    /// Relay one envelope to every matching subscription.
    ///
    /// Returns the number of subscriptions the envelope was queued to. The
    /// envelope itself is never parsed here; topic match is the only
    /// inspection the broker performs.
    pub async fn relay(&self, envelope: Envelope) -> usize {
        let subscriptions = self.subscriptions.read().await;

        let mut matched = 0;
        for subscription in subscriptions.values() {
            if subscription.filter.matches(&envelope.topic) {
                // send only fails when the receiver is gone; the connection
                // task deregisters itself, so just skip.
                if subscription.tx.send(envelope.clone()).is_ok() {
                    matched += 1;
                }
            }
        }

        self.stats.record_delivered(matched as u64);
        matched
    }

    /// Number of active subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}
