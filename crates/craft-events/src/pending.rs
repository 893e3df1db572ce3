//! Pending-invocation bookkeeping shared by both endpoint kinds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::EventError;

type Settlement = Result<Value, EventError>;

struct PendingEntry {
    /// Target window of a host-issued call; `None` for client-issued calls.
    window: Option<String>,
    tx: oneshot::Sender<Settlement>,
    #[allow(dead_code)]
    created_at: Instant,
}

/// Correlation-id allocator plus the table of unsettled invocations.
///
/// An entry is registered before its request crosses the process boundary, so
/// a reply can never race the bookkeeping. The first settlement for an id
/// wins; anything after that is discarded.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<u64, PendingEntry>>,
    next_id: AtomicU64,
}

impl PendingTable {
    /// Allocate a fresh correlation id and park a settlement receiver for it.
    pub fn register(&self, window: Option<String>) -> (u64, oneshot::Receiver<Settlement>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            window,
            tx,
            created_at: Instant::now(),
        };
        self.entries
            .lock()
            .expect("pending table lock poisoned")
            .insert(id, entry);
        (id, rx)
    }

    /// Settle the invocation with the given id. Returns `false` when the id is
    /// unknown (already settled or never registered), in which case the
    /// settlement is dropped.
    pub fn settle(&self, id: u64, result: Settlement) -> bool {
        let entry = self
            .entries
            .lock()
            .expect("pending table lock poisoned")
            .remove(&id);
        match entry {
            Some(entry) => {
                // The caller may have been dropped; nothing left to do then.
                let _ = entry.tx.send(result);
                true
            }
            None => {
                debug!(correlation_id = id, "discarding settlement for unknown id");
                false
            }
        }
    }

    /// Drop a registration that never made it onto the wire.
    pub fn discard(&self, id: u64) {
        self.entries
            .lock()
            .expect("pending table lock poisoned")
            .remove(&id);
    }

    /// Reject every pending invocation targeting the given window.
    pub fn reject_window(&self, window: &str) {
        let drained: Vec<PendingEntry> = {
            let mut entries = self.entries.lock().expect("pending table lock poisoned");
            let ids: Vec<u64> = entries
                .iter()
                .filter(|(_, e)| e.window.as_deref() == Some(window))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| entries.remove(&id)).collect()
        };
        for entry in drained {
            let _ = entry.tx.send(Err(EventError::target_gone(window)));
        }
    }

    /// Reject everything still pending, used when the peer endpoint is gone.
    pub fn reject_all(&self, peer: &str) {
        let drained: Vec<PendingEntry> = {
            let mut entries = self.entries.lock().expect("pending table lock poisoned");
            entries.drain().map(|(_, e)| e).collect()
        };
        for entry in drained {
            let _ = entry.tx.send(Err(EventError::target_gone(peer)));
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("pending table lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_settlement_is_exactly_once() {
        let table = PendingTable::default();
        let (id, rx) = table.register(None);

        assert!(table.settle(id, Ok(json!(1))));
        assert!(!table.settle(id, Ok(json!(2))), "second settlement discarded");

        let value = rx.await.unwrap().unwrap();
        assert_eq!(value, json!(1));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_reject_window_only_hits_that_target() {
        let table = PendingTable::default();
        let (_, rx_a) = table.register(Some("win-a".to_string()));
        let (id_b, _rx_b) = table.register(Some("win-b".to_string()));

        table.reject_window("win-a");

        match rx_a.await.unwrap() {
            Err(EventError::TargetGone { window, .. }) => assert_eq!(window, "win-a"),
            other => panic!("unexpected settlement: {other:?}"),
        }
        assert_eq!(table.len(), 1);
        assert!(table.settle(id_b, Ok(json!(null))));
    }

    #[test]
    fn test_ids_are_unique_and_monotonic() {
        let table = PendingTable::default();
        let (a, _ra) = table.register(None);
        let (b, _rb) = table.register(None);
        assert!(b > a);
    }
}
