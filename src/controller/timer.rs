//! Timers: the [`Scheduler`] port and the single-deadline [`SleepTimer`].
//!
//! Timers never call back into the controller directly.  They post a
//! [`ControllerEvent`] into the event channel when they expire, so expiry is
//! handled in order with every other event.  Each expiry carries a tag
//! (sleep generation, session id) that the controller checks, which makes a
//! late fire after cancellation harmless.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::event::{ControllerEvent, EventSender};

// ---------------------------------------------------------------------------
// Scheduler trait
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Deliver `event` after `delay` unless cancelled first.
pub trait Scheduler: Send {
    fn schedule(&mut self, delay: Duration, event: ControllerEvent) -> TimerId;

    /// Cancelling an expired or unknown timer is a no-op.
    fn cancel(&mut self, id: TimerId);
}

// ---------------------------------------------------------------------------
// TokioScheduler
// ---------------------------------------------------------------------------

/// [`Scheduler`] backed by `tokio::time::sleep` tasks.
///
/// Must be used from within a tokio runtime.
pub struct TokioScheduler {
    events: EventSender,
    next_id: u64,
    pending: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, event: ControllerEvent) -> TimerId {
        self.pending.retain(|_, handle| !handle.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
        self.pending.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.pending.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// SleepTimer
// ---------------------------------------------------------------------------

/// Inactivity countdown while awake.
///
/// At most one deadline is outstanding.  Re-arming cancels the previous
/// deadline and bumps the generation, so only the newest expiry is honoured.
#[derive(Debug)]
pub struct SleepTimer {
    duration: Duration,
    generation: u64,
    pending: Option<TimerId>,
}

impl SleepTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            generation: 0,
            pending: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Start (or restart) the full countdown.
    pub fn arm(&mut self, scheduler: &mut dyn Scheduler) {
        self.cancel(scheduler);
        self.generation += 1;
        let event = ControllerEvent::SleepTimerFired {
            generation: self.generation,
        };
        self.pending = Some(scheduler.schedule(self.duration, event));
    }

    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    /// Accept an expiry.  Returns `false` for a stale or cancelled one.
    pub fn take_fire(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use manual::ManualScheduler;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
