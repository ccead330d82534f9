//! Statistics for the broker relay path

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Relay counters, updated lock-free from connection tasks.
#[derive(Debug)]
pub struct BrokerStats {
    /// Envelopes accepted on ingress.
    envelopes_in: AtomicU64,
    /// Envelope deliveries queued to subscribers (one envelope fanned out to
    /// three subscribers counts three).
    envelopes_out: AtomicU64,
    /// Deliveries lost to subscriber queue overflow.
    envelopes_dropped: AtomicU64,
    /// Currently connected producers.
    active_producers: AtomicU64,
    /// Currently registered subscribers.
    active_subscribers: AtomicU64,
    /// When the broker started.
    started_at: Instant,
}

impl BrokerStats {
    /// Create a zeroed stats tracker.
    pub fn new() -> Self {
        Self {
            envelopes_in: AtomicU64::new(0),
            envelopes_out: AtomicU64::new(0),
            envelopes_dropped: AtomicU64::new(0),
            active_producers: AtomicU64::new(0),
            active_subscribers: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record one envelope accepted on ingress.
    pub fn record_ingress(&self) {
        self.envelopes_in.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `n` deliveries queued by one relay.
    pub fn record_delivered(&self, n: u64) {
        self.envelopes_out.fetch_add(n, Ordering::Relaxed);
    }

    /// Record `n` deliveries dropped by a lagging subscriber.
    pub fn record_dropped(&self, n: u64) {
        self.envelopes_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn producer_connected(&self) {
        self.active_producers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn producer_disconnected(&self) {
        self.active_producers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn subscriber_registered(&self) {
        self.active_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_removed(&self) {
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Point-in-time copy for logging.
    pub fn snapshot(&self) -> BrokerStatsSnapshot {
        BrokerStatsSnapshot {
            envelopes_in: self.envelopes_in.load(Ordering::Relaxed),
            envelopes_out: self.envelopes_out.load(Ordering::Relaxed),
            envelopes_dropped: self.envelopes_dropped.load(Ordering::Relaxed),
            active_producers: self.active_producers.load(Ordering::Relaxed),
            active_subscribers: self.active_subscribers.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for BrokerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`BrokerStats`].
#[derive(Debug, Clone, Default)]
pub struct BrokerStatsSnapshot {
    pub envelopes_in: u64,
    pub envelopes_out: u64,
    pub envelopes_dropped: u64,
    pub active_producers: u64,
    pub active_subscribers: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = BrokerStats::new();

        stats.record_ingress();
        stats.record_ingress();
        stats.record_delivered(3);
        stats.record_dropped(1);
        stats.producer_connected();
        stats.subscriber_registered();
        stats.subscriber_registered();
        stats.subscriber_removed();

        let snap = stats.snapshot();
        assert_eq!(snap.envelopes_in, 2);
        assert_eq!(snap.envelopes_out, 3);
        assert_eq!(snap.envelopes_dropped, 1);
        assert_eq!(snap.active_producers, 1);
        assert_eq!(snap.active_subscribers, 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let stats = BrokerStats::new();
        let before = stats.snapshot();
        stats.record_ingress();

        assert_eq!(before.envelopes_in, 0);
        assert_eq!(stats.snapshot().envelopes_in, 1);
    }
}
