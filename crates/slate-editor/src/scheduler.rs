//! Single-slot deferred flush, driven by the host's animation-frame tick.
//!
//! This is the engine's only asynchronous control-flow construct. There is
//! no timer thread: `schedule()` records the intent, the host calls the
//! controller's `on_frame()` once per frame, and the newest scheduled flush
//! supersedes any unfired older one (last-write-wins at tick granularity).
//! Tests drive it by calling the tick manually — a virtual frame clock.

/// Cancellable one-slot pending-flush task.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: Option<u64>,
    generation: u64,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a flush for the next tick, superseding any unfired one.
    /// Returns the generation of the scheduled flush.
    pub fn schedule(&mut self) -> u64 {
        self.generation += 1;
        if let Some(stale) = self.pending.replace(self.generation) {
            log::trace!("flush {stale} superseded by {}", self.generation);
        }
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cancel without firing. Part of the teardown contract: a dangling
    /// flush must never mutate a destroyed graph.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Consume the due flush at a frame tick, if any. At most one flush
    /// fires per tick, always the newest scheduled.
    pub fn take_due(&mut self) -> Option<u64> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_then_tick_fires_once() {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule();
        assert!(scheduler.is_pending());
        assert!(scheduler.take_due().is_some());
        assert!(scheduler.take_due().is_none());
    }

    #[test]
    fn newer_schedule_supersedes_older() {
        let mut scheduler = FrameScheduler::new();
        let first = scheduler.schedule();
        let second = scheduler.schedule();
        assert_ne!(first, second);
        // Only the newest fires; the older one never does.
        assert_eq!(scheduler.take_due(), Some(second));
        assert!(scheduler.take_due().is_none());
    }

    #[test]
    fn cancel_discards_pending() {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule();
        scheduler.cancel();
        assert!(!scheduler.is_pending());
        assert!(scheduler.take_due().is_none());
    }
}
