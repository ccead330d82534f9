//! The latest-frame snapshot
//!
//! One writer (the ingest task) repeatedly replaces the snapshot; any number
//! of readers (HTTP streaming connections) observe it. Replacement is a
//! single `watch` send of an immutable `Arc`, so a reader can never see old
//! metadata paired with a new payload or vice versa, and no lock is held
//! across the two fields. The channel retains only the newest value: a
//! reader that falls behind simply sees the latest snapshot on its next
//! turn; nothing queues per reader.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;

use crate::envelope::FrameMetadata;

/// One retained frame: metadata and payload from the same envelope.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Decoded metadata record.
    pub metadata: FrameMetadata,
    /// Encoded image bytes.
    pub payload: Bytes,
}

/// Reader handle: waits for snapshot changes.
pub type SnapshotWatcher = watch::Receiver<Option<Arc<FrameSnapshot>>>;

/// Single-writer, multi-reader cell holding the most recent frame.
pub struct SnapshotCell {
    tx: watch::Sender<Option<Arc<FrameSnapshot>>>,
}

impl SnapshotCell {
    /// Create an empty cell (no frame yet).
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Atomically replace the snapshot and wake all watchers.
    pub fn store(&self, snapshot: FrameSnapshot) {
        self.tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// The current snapshot, if any frame has arrived yet.
    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.tx.borrow().clone()
    }

    /// New independent watcher. Each HTTP connection holds its own, so a
    /// slow one never affects the others.
    pub fn watch(&self) -> SnapshotWatcher {
        self.tx.subscribe()
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(seq: u64, tag: u8) -> FrameSnapshot {
        FrameSnapshot {
            metadata: FrameMetadata::new(seq, seq * 10, 4, 4, 80, "test"),
            payload: Bytes::from(vec![tag; 8]),
        }
    }

    #[test]
    fn test_starts_empty() {
        assert!(SnapshotCell::new().latest().is_none());
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let cell = SnapshotCell::new();
        cell.store(snapshot(1, 0xAA));
        cell.store(snapshot(2, 0xBB));

        let latest = cell.latest().unwrap();
        assert_eq!(latest.metadata.seq, 2);
        assert_eq!(latest.payload[0], 0xBB);
    }

    #[tokio::test]
    async fn test_watcher_sees_changes() {
        let cell = SnapshotCell::new();
        let mut watcher = cell.watch();

        cell.store(snapshot(1, 0x11));
        watcher.changed().await.unwrap();

        let seen = watcher.borrow_and_update().clone().unwrap();
        assert_eq!(seen.metadata.seq, 1);
    }

    #[tokio::test]
    async fn test_lagging_watcher_skips_to_latest() {
        let cell = SnapshotCell::new();
        let mut watcher = cell.watch();

        for seq in 1..=50 {
            cell.store(snapshot(seq, seq as u8));
        }

        // Intermediate frames are gone; only the newest is observable.
        watcher.changed().await.unwrap();
        let seen = watcher.borrow_and_update().clone().unwrap();
        assert_eq!(seen.metadata.seq, 50);
    }

    /// Readers must never observe metadata and payload from two different
    /// stores. Every payload byte is derived from the sequence number, so a
    /// torn pair would be detectable here.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_torn_reads_under_concurrent_writes() {
        let cell = Arc::new(SnapshotCell::new());

        let writer = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move {
                for seq in 0..1000u64 {
                    cell.store(snapshot(seq, (seq % 256) as u8));
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                tokio::spawn(async move {
                    for _ in 0..500 {
                        if let Some(snap) = cell.latest() {
                            let expected = (snap.metadata.seq % 256) as u8;
                            assert!(snap.payload.iter().all(|&b| b == expected));
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
