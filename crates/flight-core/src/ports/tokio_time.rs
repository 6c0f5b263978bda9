use super::{Clock, Scheduler};
use crate::types::TimerId;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;

/// Real-time scheduler on tokio's clock
///
/// Deadlines use `tokio::time::Instant`, so a paused test runtime controls
/// them. Completion stamps come from the wall clock.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    next_id: u64,
    timers: BTreeSet<(Instant, TimerId)>,
}

impl TokioScheduler {
    /// Scheduler with no armed timers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest armed deadline; the event loop sleeps until it
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.first().map(|(deadline, _)| *deadline)
    }

    fn deadline_of(&self, timer: TimerId) -> Option<Instant> {
        self.timers
            .iter()
            .find(|(_, id)| *id == timer)
            .map(|(deadline, _)| *deadline)
    }
}

impl Clock for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert((Instant::now() + delay, id));
        id
    }

    fn cancel(&mut self, timer: TimerId) -> bool {
        match self.deadline_of(timer) {
            Some(deadline) => self.timers.remove(&(deadline, timer)),
            None => false,
        }
    }

    fn is_pending(&self, timer: TimerId) -> bool {
        self.deadline_of(timer).is_some()
    }

    fn expired(&mut self) -> Vec<TimerId> {
        let now = Instant::now();
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.timers.first() {
            if deadline > now {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_due_after_sleep() {
        let mut sched = TokioScheduler::new();
        let t = sched.schedule(Duration::from_millis(1500));
        assert!(sched.expired().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(sched.expired(), vec![t]);
        assert!(sched.next_deadline().is_none());
    }
}
