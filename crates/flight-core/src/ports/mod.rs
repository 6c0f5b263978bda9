//! Injected dependencies of the controller
//!
//! The controller never reads the wall clock, arms a real timer, or touches a
//! global RNG on its own. Everything time- or chance-related goes through the
//! traits below, so tests can drive it deterministically.

mod random;
mod tokio_time;
mod virtual_time;

pub use random::SeededRandom;
pub use tokio_time::TokioScheduler;
pub use virtual_time::VirtualScheduler;

use crate::types::TimerId;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Source of completion timestamps
pub trait Clock {
    /// Current time as seen by this clock
    fn now(&self) -> DateTime<Utc>;
}

/// One-shot timer registry
///
/// Scheduling only records a deadline. Firing is pulled by the event loop via
/// [`expired`](Scheduler::expired), which keeps completion on the same logical
/// thread as `submit`.
pub trait Scheduler {
    /// Arm a timer that becomes due after `delay`
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Disarm a timer; `false` if it was not pending
    fn cancel(&mut self, timer: TimerId) -> bool;

    /// Whether `timer` is armed and not yet drained
    fn is_pending(&self, timer: TimerId) -> bool;

    /// Remove and return every due timer, earliest deadline first
    fn expired(&mut self) -> Vec<TimerId>;

    /// Number of armed timers
    fn pending(&self) -> usize;
}

/// Randomness used for delays and outcomes
pub trait RandomSource {
    /// Uniform draw from `min..=max`
    fn uniform_ms(&mut self, min: u64, max: u64) -> u64;

    /// Uniform draw from `[0, 1)`
    fn unit(&mut self) -> f64;

    /// `true` with the given probability; `1.0` always, `0.0` never
    fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn uniform_ms(&mut self, min: u64, max: u64) -> u64 {
        (**self).uniform_ms(min, max)
    }

    fn unit(&mut self) -> f64 {
        (**self).unit()
    }
}
