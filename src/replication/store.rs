//! Shared event store
//!
//! The store is the only thing the two peers of a match share. It keeps one
//! append-only log per match and refuses a second event for a sequence number
//! that is already taken.

use crate::core::MatchId;
use crate::replication::MatchEvent;
use crate::{ClashError, Result};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::{broadcast, RwLock};

/// Capacity of each match's notification channel
const NOTIFY_CAPACITY: usize = 256;

/// Read/write interface of the durable event log
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Durably write one event; a taken sequence is a `SequenceConflict`
    async fn append(&self, event: MatchEvent) -> Result<()>;

    /// Every currently visible event of the match (order not guaranteed)
    async fn snapshot(&self, match_id: &MatchId) -> Result<Vec<MatchEvent>>;

    /// Receiver of sequence numbers as events become visible
    async fn subscribe(&self, match_id: &MatchId) -> broadcast::Receiver<u64>;

    /// Whole-match teardown; returns how many events were removed
    async fn delete_match(&self, match_id: &MatchId) -> Result<usize>;
}

struct MatchLog {
    events: BTreeMap<u64, MatchEvent>,
    notify: broadcast::Sender<u64>,
}

impl MatchLog {
    fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        MatchLog {
            events: BTreeMap::new(),
            notify,
        }
    }
}

#[derive(Default)]
struct StoreInner {
    matches: FxHashMap<MatchId, MatchLog>,
    /// Appends still to fail (failure injection)
    failing_appends: u32,
    /// Written but not yet visible to snapshots
    hidden: BTreeSet<(MatchId, u64)>,
}

/// In-process event store
///
/// Stands in for a networked backend in tests and the `replicate` command.
/// Supports injecting write failures and delaying visibility of events.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<StoreInner>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` appends fail without writing
    pub async fn fail_next_appends(&self, count: u32) {
        self.inner.write().await.failing_appends = count;
    }

    /// Keep `sequence` out of snapshots until `reveal` is called
    pub async fn hide_from_snapshots(&self, match_id: &MatchId, sequence: u64) {
        self.inner
            .write()
            .await
            .hidden
            .insert((match_id.clone(), sequence));
    }

    /// Make every hidden event of the match visible again
    pub async fn reveal(&self, match_id: &MatchId) {
        let mut inner = self.inner.write().await;
        let revealed: Vec<u64> = inner
            .hidden
            .iter()
            .filter(|(m, _)| m == match_id)
            .map(|(_, seq)| *seq)
            .collect();
        inner.hidden.retain(|(m, _)| m != match_id);
        if let Some(log) = inner.matches.get(match_id) {
            for seq in revealed {
                let _ = log.notify.send(seq);
            }
        }
    }

    pub async fn len(&self, match_id: &MatchId) -> usize {
        self.inner
            .read()
            .await
            .matches
            .get(match_id)
            .map(|log| log.events.len())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: MatchEvent) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.failing_appends > 0 {
            inner.failing_appends -= 1;
            return Err(ClashError::StoreWrite {
                sequence: event.sequence,
                reason: "injected write failure".into(),
            });
        }

        let hidden = inner
            .hidden
            .contains(&(event.match_id.clone(), event.sequence));
        let log = inner
            .matches
            .entry(event.match_id.clone())
            .or_insert_with(MatchLog::new);
        if log.events.contains_key(&event.sequence) {
            return Err(ClashError::SequenceConflict(event.sequence));
        }
        let sequence = event.sequence;
        log.events.insert(sequence, event);
        if !hidden {
            // No receivers is fine
            let _ = log.notify.send(sequence);
        }
        Ok(())
    }

    async fn snapshot(&self, match_id: &MatchId) -> Result<Vec<MatchEvent>> {
        let inner = self.inner.read().await;
        let Some(log) = inner.matches.get(match_id) else {
            return Ok(Vec::new());
        };
        Ok(log
            .events
            .values()
            .filter(|e| !inner.hidden.contains(&(match_id.clone(), e.sequence)))
            .cloned()
            .collect())
    }

    async fn subscribe(&self, match_id: &MatchId) -> broadcast::Receiver<u64> {
        let mut inner = self.inner.write().await;
        inner
            .matches
            .entry(match_id.clone())
            .or_insert_with(MatchLog::new)
            .notify
            .subscribe()
    }

    async fn delete_match(&self, match_id: &MatchId) -> Result<usize> {
        let mut inner = self.inner.write().await;
        inner.hidden.retain(|(m, _)| m != match_id);
        Ok(inner
            .matches
            .remove(match_id)
            .map(|log| log.events.len())
            .unwrap_or(0))
    }
}
