//! Replication log client
//!
//! Owns one peer's view of a match's event log:
//! - `enqueue_event` reserves the next sequence number in memory and queues
//!   the event for writing
//! - `flush` writes the queue to the store in order, rolling the counter back
//!   when a write fails
//! - `ingest` replays the contiguous run of events after the last applied one
//!
//! The author of an event does not apply it when enqueueing; it is applied
//! like any other event once it comes back through `ingest`.

use crate::core::MatchId;
use crate::game::{GameLogger, GameState};
use crate::loader::CardCatalog;
use crate::replication::{apply_event, EventPayload, EventStore, MatchEvent};
use crate::{ClashError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Whether the caller is in the middle of replaying events
///
/// Enqueueing is only legal while `Idle`; passing the mode explicitly keeps
/// the rule visible at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    #[default]
    Idle,
    Replaying,
}

/// Outcome of one `ingest` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub applied: usize,
    /// Already applied, skipped
    pub stale: usize,
    /// Behind a gap; picked up once the gap is visible
    pub waiting: usize,
}

pub struct ReplicationClient {
    match_id: MatchId,
    store: Arc<dyn EventStore>,
    next_sequence: u64,
    last_applied: u64,
    outbox: VecDeque<MatchEvent>,
}

impl ReplicationClient {
    pub fn new(match_id: impl Into<MatchId>, store: Arc<dyn EventStore>) -> Self {
        ReplicationClient {
            match_id: match_id.into(),
            store,
            next_sequence: 1,
            last_applied: 0,
            outbox: VecDeque::new(),
        }
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Sequence number the next enqueued event will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn last_applied_sequence(&self) -> u64 {
        self.last_applied
    }

    /// Events reserved but not yet durably written
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Nothing of ours is unwritten and nothing visible is left to apply
    pub fn is_settled(&self) -> bool {
        self.outbox.is_empty() && self.last_applied + 1 >= self.next_sequence
    }

    /// Reserve a sequence number for `payload` and queue it for writing
    ///
    /// Refused with `ProtocolViolation` while replaying.
    pub fn enqueue_event(&mut self, mode: ReplayMode, payload: EventPayload) -> Result<u64> {
        if mode == ReplayMode::Replaying {
            return Err(ClashError::ProtocolViolation(format!(
                "{} enqueued while replaying",
                payload.type_name()
            )));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.outbox.push_back(MatchEvent::new(
            self.match_id.clone(),
            sequence,
            payload,
            now_ms(),
        ));
        Ok(sequence)
    }

    /// Write queued events in order
    ///
    /// On the first failed write the counter goes back to that event's
    /// sequence and everything still queued is dropped (never sent). Returns
    /// how many events were written.
    pub async fn flush(&mut self) -> Result<usize> {
        let mut written = 0;
        while let Some(event) = self.outbox.front() {
            let sequence = event.sequence;
            match self.store.append(event.clone()).await {
                Ok(()) => {
                    self.outbox.pop_front();
                    written += 1;
                }
                Err(e) => {
                    self.next_sequence = sequence;
                    self.outbox.clear();
                    return Err(e);
                }
            }
        }
        Ok(written)
    }

    /// Replay a snapshot against `slot`
    ///
    /// Events are sorted by sequence; only the run starting right after the
    /// last applied sequence is applied, stopping at the first gap. Events at
    /// or below the last applied sequence are skipped, and events of other
    /// matches are ignored.
    pub fn ingest(
        &mut self,
        slot: &mut Option<GameState>,
        mut events: Vec<MatchEvent>,
        catalog: &Arc<CardCatalog>,
        logger: &GameLogger,
    ) -> IngestReport {
        events.retain(|e| e.match_id == self.match_id);
        events.sort_by_key(|e| e.sequence);
        let mut report = IngestReport::default();

        for (index, event) in events.iter().enumerate() {
            if event.sequence <= self.last_applied {
                report.stale += 1;
                let logger = slot.as_ref().map(|g| &g.logger).unwrap_or(logger);
                logger.category(
                    "replication",
                    &format!("skipping already applied #{}", event.sequence),
                );
                continue;
            }
            if event.sequence != self.last_applied + 1 {
                report.waiting = events.len() - index;
                break;
            }

            apply_event(slot, event, catalog, logger);
            self.last_applied = event.sequence;
            self.next_sequence = self.next_sequence.max(event.sequence + 1);
            report.applied += 1;
        }
        report
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
