use super::{Clock, Scheduler};
use crate::types::TimerId;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

/// Deterministic virtual time: timers fire only when time is advanced
///
/// Timers are ordered by `(deadline, id)`, so timers sharing a deadline
/// fire in scheduling order.
#[derive(Debug, Clone)]
pub struct VirtualScheduler {
    origin: DateTime<Utc>,
    elapsed: Duration,
    next_id: u64,
    timers: BTreeSet<(Duration, TimerId)>,
}

impl VirtualScheduler {
    /// Virtual clock starting at the Unix epoch
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Virtual clock starting at `origin`
    #[must_use]
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            elapsed: Duration::ZERO,
            next_id: 0,
            timers: BTreeSet::new(),
        }
    }

    /// Time elapsed since the origin
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Move virtual time forward; does not fire anything by itself
    pub fn advance(&mut self, by: Duration) {
        self.elapsed = self.elapsed.saturating_add(by);
    }

    /// Move virtual time to `at` if it lies in the future
    pub fn advance_to(&mut self, at: Duration) {
        self.elapsed = self.elapsed.max(at);
    }

    /// Earliest armed deadline, as elapsed time since the origin
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.first().map(|(deadline, _)| *deadline)
    }

    /// Deadline of a specific armed timer
    #[must_use]
    pub fn deadline_of(&self, timer: TimerId) -> Option<Duration> {
        self.timers
            .iter()
            .find(|(_, id)| *id == timer)
            .map(|(deadline, _)| *deadline)
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualScheduler {
    fn now(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.elapsed.as_millis()).unwrap_or(i64::MAX);
        TimeDelta::try_milliseconds(millis)
            .and_then(|delta| self.origin.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert((self.elapsed.saturating_add(delay), id));
        id
    }

    fn cancel(&mut self, timer: TimerId) -> bool {
        match self.deadline_of(timer) {
            Some(deadline) => self.timers.remove(&(deadline, timer)),
            None => false,
        }
    }

    fn is_pending(&self, timer: TimerId) -> bool {
        self.timers.iter().any(|(_, id)| *id == timer)
    }

    fn expired(&mut self) -> Vec<TimerId> {
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.timers.first() {
            if deadline > self.elapsed {
                break;
            }
            self.timers.pop_first();
            due.push(id);
        }
        due
    }

    fn pending(&self) -> usize {
        self.timers.len()
    }
}
