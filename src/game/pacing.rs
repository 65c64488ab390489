//! Deferred tasks on a manual clock
//!
//! Pauses before automated or unblocked actions are modelled as tasks that
//! become due once enough time has been fed in through `advance`. Nothing here
//! reads the wall clock; the CLI feeds real elapsed time and tests feed
//! whatever they like.

use crate::core::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// What a task belongs to; clearing the owner clears its tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Pending(u64),
    Combat,
    Automation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredTask {
    /// The defender had nothing to block with
    ResolveUnblockedCombat,
    /// An automated seat takes its next step
    AutomatedStep(Seat),
    /// An automated seat picks targets for and confirms a pending action
    AutoResolvePending(u64),
}

#[derive(Debug, Clone)]
struct Scheduled {
    id: TaskId,
    due_at: u64,
    owner: TaskOwner,
    task: DeferredTask,
}

#[derive(Debug, Clone, Default)]
pub struct Pacer {
    now_ms: u64,
    next_id: u64,
    queue: Vec<Scheduled>,
}

impl Pacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, owner: TaskOwner, task: DeferredTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push(Scheduled {
            id,
            due_at: self.now_ms + delay_ms,
            owner,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|s| s.id != id);
        self.queue.len() != before
    }

    /// Drop every task belonging to `owner`; returns how many were dropped
    pub fn cancel_owned(&mut self, owner: TaskOwner) -> usize {
        let before = self.queue.len();
        self.queue.retain(|s| s.owner != owner);
        before - self.queue.len()
    }

    pub fn is_scheduled(&self, task: DeferredTask) -> bool {
        self.queue.iter().any(|s| s.task == task)
    }

    pub fn has_owned(&self, owner: TaskOwner) -> bool {
        self.queue.iter().any(|s| s.owner == owner)
    }

    /// Milliseconds until the next task is due
    pub fn next_due_in(&self) -> Option<u64> {
        self.queue
            .iter()
            .map(|s| s.due_at.saturating_sub(self.now_ms))
            .min()
    }

    /// Move the clock forward and take every task now due, earliest first
    /// (ties in scheduling order)
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<DeferredTask> {
        self.now_ms += elapsed_ms;
        let now = self.now_ms;
        let (mut due, pending): (Vec<Scheduled>, Vec<Scheduled>) =
            self.queue.drain(..).partition(|s| s.due_at <= now);
        self.queue = pending;
        due.sort_by_key(|s| (s.due_at, s.id));
        due.into_iter().map(|s| s.task).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_fire_when_due() {
        let mut pacer = Pacer::new();
        pacer.schedule(800, TaskOwner::Combat, DeferredTask::ResolveUnblockedCombat);
        pacer.schedule(400, TaskOwner::Automation, DeferredTask::AutomatedStep(Seat::FIRST));

        assert!(pacer.advance(399).is_empty());
        assert_eq!(pacer.advance(1), vec![DeferredTask::AutomatedStep(Seat::FIRST)]);
        assert_eq!(pacer.next_due_in(), Some(400));
        assert_eq!(pacer.advance(1000), vec![DeferredTask::ResolveUnblockedCombat]);
        assert!(pacer.is_empty());
    }

    #[test]
    fn test_cancel_by_owner() {
        let mut pacer = Pacer::new();
        pacer.schedule(10, TaskOwner::Pending(3), DeferredTask::AutoResolvePending(3));
        let keep = pacer.schedule(10, TaskOwner::Combat, DeferredTask::ResolveUnblockedCombat);

        assert_eq!(pacer.cancel_owned(TaskOwner::Pending(3)), 1);
        assert!(!pacer.is_scheduled(DeferredTask::AutoResolvePending(3)));
        assert!(pacer.cancel(keep));
        assert!(pacer.advance(100).is_empty());
    }

    #[test]
    fn test_same_due_time_keeps_schedule_order() {
        let mut pacer = Pacer::new();
        pacer.schedule(5, TaskOwner::Automation, DeferredTask::AutomatedStep(Seat::SECOND));
        pacer.schedule(5, TaskOwner::Automation, DeferredTask::AutomatedStep(Seat::FIRST));
        assert_eq!(
            pacer.advance(5),
            vec![
                DeferredTask::AutomatedStep(Seat::SECOND),
                DeferredTask::AutomatedStep(Seat::FIRST)
            ]
        );
    }
}
