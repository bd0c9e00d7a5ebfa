use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::core::Event;

const BUS_CAPACITY: usize = 64;

pub struct SnapshotBus {
    tx: broadcast::Sender<Vec<Event>>,
    seq: AtomicU64,
}

impl SnapshotBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Publish the full current event list. Returns the number of receivers
    /// that will see it.
    pub fn publish(&self, events: Vec<Event>) -> usize {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let count = events.len();
        match self.tx.send(events) {
            Ok(receivers) => {
                tracing::debug!(seq, count, receivers, "published event snapshot");
                receivers
            }
            Err(_) => {
                tracing::debug!(seq, count, "event snapshot dropped, no subscribers");
                0
            }
        }
    }

    /// Get a new receiver for this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Event>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}
