//! Cooperative fixed-interval task.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity of one started periodic task.
///
/// Every start yields a fresh generation, so a handle kept across a
/// stop/start pair never aliases the new task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub u64);

/// A task polled from the frame loop that fires once per `interval`.
///
/// The first tick fires on the first poll at or after the start time.
/// Missed intervals are not replayed: after a long frame the next tick is
/// scheduled one interval after the tick that just ran.
#[derive(Clone, Debug)]
pub struct PeriodicTask {
    handle: TaskHandle,
    interval: Duration,
    next_due: Duration,
    ticks: u64,
}

impl PeriodicTask {
    pub fn start(handle: TaskHandle, interval: Duration, now: Duration) -> Self {
        Self {
            handle,
            interval,
            next_due: now,
            ticks: 0,
        }
    }

    #[inline]
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[inline]
    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Return `true` and reschedule if the task is due at `now`.
    pub fn poll(&mut self, now: Duration) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        self.ticks += 1;
        true
    }
}
