//! Single-flight simulated request controller
//!
//! # Critical Invariant
//!
//! At most one operation is in flight, and the controller is `Busy` exactly
//! when its completion timer is armed. Both `submit` and completion need
//! `&mut self`, so a completion always finishes (outcome drawn, observer
//! notified, state back to `Idle`) before the next `submit` is looked at.

use crate::config::SimulatorConfig;
use crate::error::{ConfigError, Rejected};
use crate::observer::Observer;
use crate::ports::{Clock, RandomSource, Scheduler, VirtualScheduler};
use crate::state_machine::validate_transition;
use crate::types::{
    Accepted, ControllerState, FlightEvent, InFlight, OperationOutcome, OperationRequest, Phase,
};
use std::time::Duration;

/// Accepts one named operation at a time and reports its randomized outcome
///
/// The scheduler, random source and observer are injected; see
/// [`ports`](crate::ports).
#[derive(Debug)]
pub struct SingleFlightSimulator<S, R, O> {
    config: SimulatorConfig,
    scheduler: S,
    random: R,
    observer: O,
    state: ControllerState,
}

impl<S, R, O> SingleFlightSimulator<S, R, O>
where
    S: Scheduler + Clock,
    R: RandomSource,
    O: Observer,
{
    /// Create an idle simulator
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` fails validation.
    pub fn new(
        config: SimulatorConfig,
        scheduler: S,
        random: R,
        observer: O,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler,
            random,
            observer,
            state: ControllerState::Idle,
        })
    }

    /// Submit an operation
    ///
    /// Idle: draws a delay from the configured range, arms the completion
    /// timer, goes `Busy` and notifies `accepted`.
    ///
    /// Busy: notifies `rejected` and leaves everything else untouched.
    ///
    /// # Errors
    /// Returns [`Rejected`] while another operation is in flight.
    pub fn submit(&mut self, request: OperationRequest) -> Result<Accepted, Rejected> {
        if let ControllerState::Busy(in_flight) = &self.state {
            let rejected = Rejected {
                name: request.into_name(),
                in_flight: in_flight.request.name().to_owned(),
            };
            tracing::warn!(
                name = %rejected.name,
                in_flight = %rejected.in_flight,
                "Rejecting operation while busy"
            );
            self.observer.notify(&FlightEvent::Rejected {
                name: rejected.name.clone(),
            });
            return Err(rejected);
        }

        let range = self.config.delay;
        let delay_ms = self.random.uniform_ms(range.min_ms, range.max_ms);
        let delay = Duration::from_millis(delay_ms);
        let timer = self.scheduler.schedule(delay);
        let name = request.name().to_owned();

        self.set_state(ControllerState::Busy(InFlight {
            request,
            timer,
            delay,
        }));
        tracing::debug!(%name, %timer, delay_ms, "Accepted operation");
        self.observer.notify(&FlightEvent::Accepted { name: name.clone() });

        Ok(Accepted { name, timer, delay })
    }

    /// Complete the in-flight operation if its timer has fired
    ///
    /// Event loops call this whenever the scheduler may have due timers.
    /// Returns the outcomes produced, which is at most one.
    pub fn poll_timers(&mut self) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::new();
        for timer in self.scheduler.expired() {
            let name = match self.state.in_flight() {
                Some(in_flight) if in_flight.timer == timer => in_flight.request.name().to_owned(),
                _ => {
                    tracing::warn!(%timer, "Ignoring stale completion timer");
                    continue;
                }
            };
            outcomes.push(self.complete(name));
        }
        outcomes
    }

    /// Abandon the in-flight operation
    ///
    /// Disarms the timer, returns to `Idle` and notifies `cancelled`. Returns
    /// the abandoned request, or `None` when idle. Nothing in the default flow
    /// calls this; accepted operations otherwise always run to completion.
    pub fn cancel(&mut self) -> Option<OperationRequest> {
        let in_flight = self.state.in_flight()?.clone();
        self.scheduler.cancel(in_flight.timer);
        tracing::debug!(name = %in_flight.request, timer = %in_flight.timer, "Cancelled operation");
        self.observer.notify(&FlightEvent::Cancelled {
            name: in_flight.request.name().to_owned(),
        });
        self.set_state(ControllerState::Idle);
        Some(in_flight.request)
    }

    /// `Busy` if and only if exactly the in-flight timer is armed
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match &self.state {
            ControllerState::Idle => self.scheduler.pending() == 0,
            ControllerState::Busy(in_flight) => {
                self.scheduler.pending() == 1 && self.scheduler.is_pending(in_flight.timer)
            }
        }
    }

    fn complete(&mut self, name: String) -> OperationOutcome {
        let succeeded = self.random.chance(self.config.success_probability);
        let outcome = OperationOutcome {
            name,
            succeeded,
            completed_at: self.scheduler.now(),
        };
        tracing::debug!(name = %outcome.name, succeeded, "Operation completed");
        self.observer.notify(&outcome.to_event());
        self.set_state(ControllerState::Idle);
        outcome
    }

    fn set_state(&mut self, next: ControllerState) {
        if let Err(err) = validate_transition(self.state.phase(), next.phase()) {
            tracing::error!(%err, "Controller phase change outside the allowed matrix");
        }
        self.state = next;
    }
}

impl<S, R, O> SingleFlightSimulator<S, R, O> {
    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Whether an operation is in flight
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase() == Phase::Busy
    }

    /// Validated configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Injected scheduler
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Injected observer
    #[inline]
    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Injected observer, mutably
    #[inline]
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Take the injected parts back
    pub fn into_parts(self) -> (S, R, O) {
        (self.scheduler, self.random, self.observer)
    }
}

impl<R, O> SingleFlightSimulator<VirtualScheduler, R, O>
where
    R: RandomSource,
    O: Observer,
{
    /// Advance virtual time by `by`, firing completions exactly at their
    /// deadlines along the way
    pub fn advance(&mut self, by: Duration) -> Vec<OperationOutcome> {
        let target = self.scheduler.elapsed().saturating_add(by);
        let mut outcomes = Vec::new();
        while let Some(deadline) = self.scheduler.next_deadline() {
            if deadline > target {
                break;
            }
            self.scheduler.advance_to(deadline);
            outcomes.extend(self.poll_timers());
        }
        self.scheduler.advance_to(target);
        outcomes
    }

    /// Advance virtual time until the in-flight operation completes
    pub fn run_until_idle(&mut self) -> Vec<OperationOutcome> {
        match self.scheduler.next_deadline() {
            Some(deadline) => {
                let by = deadline.saturating_sub(self.scheduler.elapsed());
                self.advance(by)
            }
            None => Vec::new(),
        }
    }

    /// Virtual time elapsed since the scheduler origin
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.scheduler.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crate::ports::SeededRandom;

    fn sim(
        config: SimulatorConfig,
    ) -> SingleFlightSimulator<VirtualScheduler, SeededRandom, RecordingObserver> {
        SingleFlightSimulator::new(
            config,
            VirtualScheduler::new(),
            SeededRandom::from_seed(3),
            RecordingObserver::new(),
        )
        .unwrap()
    }

    fn req(name: &str) -> OperationRequest {
        OperationRequest::new(name).unwrap()
    }

    #[test]
    fn starts_idle() {
        let sim = sim(SimulatorConfig::default());
        assert_eq!(sim.phase(), Phase::Idle);
        assert!(sim.is_consistent());
        assert!(sim.observer().events().is_empty());
    }

    #[test]
    fn invalid_config_is_refused() {
        let result = SingleFlightSimulator::new(
            SimulatorConfig::new().with_delay_range(10, 5),
            VirtualScheduler::new(),
            SeededRandom::from_seed(0),
            RecordingObserver::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn accepted_delay_within_range() {
        let mut sim = sim(SimulatorConfig::default());
        let accepted = sim.submit(req("Pizza")).unwrap();
        let ms = u64::try_from(accepted.delay.as_millis()).unwrap();
        assert!(sim.config().delay.contains(ms));
        assert_eq!(sim.scheduler().deadline_of(accepted.timer), Some(accepted.delay));
        assert!(sim.is_busy());
        assert!(sim.is_consistent());
    }

    #[test]
    fn cancel_returns_to_idle_without_outcome() {
        let mut sim = sim(SimulatorConfig::new().with_fixed_delay(100));
        sim.submit(req("Pizza")).unwrap();

        let cancelled = sim.cancel().unwrap();
        assert_eq!(cancelled.name(), "Pizza");
        assert!(!sim.is_busy());
        assert!(sim.is_consistent());

        assert!(sim.advance(Duration::from_millis(500)).is_empty());
        assert_eq!(sim.observer().count("cancelled"), 1);
        assert_eq!(sim.observer().count("succeeded") + sim.observer().count("failed"), 0);
        assert!(sim.cancel().is_none());
    }

    #[test]
    fn foreign_timers_are_ignored() {
        let mut scheduler = VirtualScheduler::new();
        let foreign = scheduler.schedule(Duration::from_millis(50));
        let mut sim = SingleFlightSimulator::new(
            SimulatorConfig::new().with_fixed_delay(100),
            scheduler,
            SeededRandom::from_seed(3),
            RecordingObserver::new(),
        )
        .unwrap();

        // Idle with an armed timer it never scheduled.
        assert!(!sim.is_consistent());
        assert!(sim.advance(Duration::from_millis(60)).is_empty());
        assert!(!sim.scheduler().is_pending(foreign));
        assert!(sim.observer().events().is_empty());
        assert!(sim.is_consistent());

        // Same while busy: only the in-flight timer completes.
        sim.submit(req("Pizza")).unwrap();
        let stray = sim.scheduler.schedule(Duration::from_millis(10));
        assert!(sim.advance(Duration::from_millis(20)).is_empty());
        assert!(sim.is_busy());
        assert!(!sim.scheduler().is_pending(stray));

        let outcomes = sim.advance(Duration::from_millis(100));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "Pizza");
    }

    #[test]
    fn run_until_idle_stops_at_deadline() {
        let mut sim = sim(SimulatorConfig::new().with_fixed_delay(1500));
        sim.submit(req("Pizza")).unwrap();
        sim.advance(Duration::from_millis(200));

        let outcomes = sim.run_until_idle();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(sim.elapsed(), Duration::from_millis(1500));
        assert!(sim.run_until_idle().is_empty());
    }
}
