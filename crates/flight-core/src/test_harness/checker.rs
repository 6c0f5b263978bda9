//! Randomized single-flight checker
//!
//! Drives a simulator on virtual time with a seeded stream of submits,
//! time advances and (optionally) cancellations, and compares every result
//! and every delivered event against a shadow model.

use crate::config::{DelayRange, SimulatorConfig};
use crate::error::Rejected;
use crate::observer::RecordingObserver;
use crate::ports::{Scheduler, SeededRandom, VirtualScheduler};
use crate::simulator::SingleFlightSimulator;
use crate::types::{Accepted, FlightEvent, OperationRequest, Phase};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt::Write as _;
use std::time::Duration;

/// Operation names the checker submits
pub const MENU: [&str; 6] = ["Pizza", "Burger", "Salad", "Soda", "Coffee", "Juice"];

/// Checker configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total steps to execute
    pub total_steps: u64,
    /// Distribution of step types
    pub distribution: StepDistribution,
    /// Upper bound of a single time advance
    pub max_advance_ms: u64,
    /// Controller configuration under test
    pub simulator: SimulatorConfig,
    /// Stop conditions
    pub stop_on_first_violation: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_steps: 10_000,
            distribution: StepDistribution::default(),
            max_advance_ms: 1_000,
            simulator: SimulatorConfig::default(),
            stop_on_first_violation: true,
        }
    }
}

/// Relative weights of generated steps
#[derive(Debug, Clone, Copy)]
pub struct StepDistribution {
    /// Weight of submit steps
    pub submit: f64,
    /// Weight of time advances
    pub advance: f64,
    /// Zero keeps the default no-cancellation behavior
    pub cancel: f64,
}

impl Default for StepDistribution {
    fn default() -> Self {
        Self {
            submit: 0.55,
            advance: 0.45,
            cancel: 0.0,
        }
    }
}

/// One generated step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Submit the named operation
    Submit(String),
    /// Advance virtual time
    Advance(Duration),
    /// Cancel whatever is in flight
    Cancel,
}

/// A violation detected while checking
#[derive(Debug, Clone)]
pub struct Violation {
    /// Index of the offending step
    pub step_index: u64,
    /// Offending step, `None` for end-of-run checks
    pub step: Option<Step>,
    /// Check that failed
    pub check: InvariantCheck,
    /// What was observed
    pub details: String,
}

/// Types of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// Simulator accepted the configuration under test
    ValidConfiguration,
    /// Busy submits are rejected, idle submits accepted
    SubmitMatchesPhase,
    /// Drawn delay lies in the configured range
    DelayWithinRange,
    /// Busy if and only if the completion timer is armed
    BusyMatchesTimer,
    /// Controller phase equals the model phase
    PhaseMatchesModel,
    /// Delivered events equal the expected events, in order
    EventsMatchTransitions,
    /// Completion fires exactly at its deadline
    CompletionAtDeadline,
    /// Every accepted operation ends with exactly one terminal event
    EveryAcceptedTerminates,
}

/// Statistics collected while checking
#[derive(Debug, Clone, Default)]
pub struct StepStats {
    /// Steps executed
    pub total_steps: u64,
    /// Submit steps
    pub submits: u64,
    /// `accepted` events
    pub accepted: u64,
    /// `rejected` events
    pub rejected: u64,
    /// Time advance steps
    pub advances: u64,
    /// `succeeded` events
    pub succeeded: u64,
    /// `failed` events
    pub failed: u64,
    /// `cancelled` events
    pub cancelled: u64,
}

impl StepStats {
    fn record_events(&mut self, events: &[FlightEvent]) {
        for event in events {
            match event {
                FlightEvent::Accepted { .. } => self.accepted += 1,
                FlightEvent::Rejected { .. } => self.rejected += 1,
                FlightEvent::Succeeded { .. } => self.succeeded += 1,
                FlightEvent::Failed { .. } => self.failed += 1,
                FlightEvent::Cancelled { .. } => self.cancelled += 1,
            }
        }
    }

    fn terminated(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Final report from the checker
#[derive(Debug, Clone)]
pub struct HarnessReport {
    /// Configuration the run used
    pub config: HarnessConfig,
    /// Step and event counts
    pub stats: StepStats,
    /// Everything that failed
    pub violations: Vec<Violation>,
    /// Virtual time at the end of the run
    pub final_elapsed: Duration,
}

impl HarnessReport {
    /// Check if the run passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Single-Flight Checker Report ===\n\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Steps: {}", self.stats.total_steps);
        let _ = writeln!(report, "Submits: {}", self.stats.submits);
        let _ = writeln!(report, "Accepted: {}", self.stats.accepted);
        let _ = writeln!(report, "Rejected: {}", self.stats.rejected);
        let _ = writeln!(report, "Succeeded: {}", self.stats.succeeded);
        let _ = writeln!(report, "Failed: {}", self.stats.failed);
        let _ = writeln!(report, "Cancelled: {}", self.stats.cancelled);
        let _ = writeln!(report, "Virtual time: {}ms", self.final_elapsed.as_millis());
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(
                    report,
                    "{}. step {} {:?} {:?}: {}",
                    i + 1,
                    v.step_index,
                    v.step,
                    v.check,
                    v.details
                );
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );

        report
    }
}

/// What the controller should look like
#[derive(Debug, Default)]
struct Model {
    in_flight: Option<(String, Duration)>,
}

impl Model {
    fn phase(&self) -> Phase {
        if self.in_flight.is_some() {
            Phase::Busy
        } else {
            Phase::Idle
        }
    }
}

type Checked = SingleFlightSimulator<VirtualScheduler, SeededRandom, RecordingObserver>;

/// Run the checker
#[must_use]
pub fn run_harness(config: HarnessConfig) -> HarnessReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = StepStats::default();
    let mut violations = Vec::new();
    let mut model = Model::default();

    let mut sim: Checked = match SingleFlightSimulator::new(
        config.simulator,
        VirtualScheduler::new(),
        SeededRandom::from_seed(config.seed.rotate_left(17) ^ 0x5eed),
        RecordingObserver::new(),
    ) {
        Ok(sim) => sim,
        Err(err) => {
            tracing::error!(%err, "Checker configuration rejected");
            return HarnessReport {
                config,
                stats,
                violations: vec![Violation {
                    step_index: 0,
                    step: None,
                    check: InvariantCheck::ValidConfiguration,
                    details: format!("simulator refused configuration: {err}"),
                }],
                final_elapsed: Duration::ZERO,
            };
        }
    };

    for i in 0..config.total_steps {
        let step = generate_step(&mut rng, &config);
        let mut found = execute_step(&mut sim, &mut model, &step, &config, &mut stats);
        found.extend(check_state(&sim, &model));

        let events = sim.observer_mut().drain();
        stats.record_events(&events);
        stats.total_steps += 1;

        let stop = !found.is_empty() && config.stop_on_first_violation;
        violations.extend(found.into_iter().map(|(check, details)| Violation {
            step_index: i,
            step: Some(step.clone()),
            check,
            details,
        }));
        if stop {
            break;
        }
    }

    // Let the last accepted operation finish before accounting.
    sim.run_until_idle();
    let events = sim.observer_mut().drain();
    stats.record_events(&events);

    if stats.accepted != stats.terminated() {
        violations.push(Violation {
            step_index: stats.total_steps,
            step: None,
            check: InvariantCheck::EveryAcceptedTerminates,
            details: format!(
                "{} accepted but {} terminal events",
                stats.accepted,
                stats.terminated()
            ),
        });
    }

    HarnessReport {
        final_elapsed: sim.elapsed(),
        config,
        stats,
        violations,
    }
}

fn generate_step(rng: &mut StdRng, config: &HarnessConfig) -> Step {
    let d = config.distribution;
    let total = d.submit + d.advance + d.cancel;
    let r: f64 = rng.random::<f64>() * total;

    if r < d.submit {
        Step::Submit(MENU[rng.random_range(0..MENU.len())].to_string())
    } else if r < d.submit + d.advance {
        Step::Advance(Duration::from_millis(rng.random_range(0..=config.max_advance_ms)))
    } else {
        Step::Cancel
    }
}

fn execute_step(
    sim: &mut Checked,
    model: &mut Model,
    step: &Step,
    config: &HarnessConfig,
    stats: &mut StepStats,
) -> Vec<(InvariantCheck, String)> {
    let mut found = Vec::new();
    let mut expected_events = Vec::new();

    match step {
        Step::Submit(name) => {
            stats.submits += 1;
            let Ok(request) = OperationRequest::new(name.clone()) else {
                return found;
            };
            let busy_with = model.in_flight.as_ref().map(|(busy, _)| busy.clone());
            let idle = busy_with.is_none();
            let result = sim.submit(request);
            let delay = result.as_ref().ok().map(|accepted| accepted.delay);

            let (event, submit_found) =
                check_submit(name, busy_with, result, config.simulator.delay);
            found.extend(submit_found);
            expected_events.extend(event);
            if let (true, Some(delay)) = (idle, delay) {
                model.in_flight = Some((name.clone(), sim.elapsed() + delay));
            }
        }
        Step::Advance(by) => {
            stats.advances += 1;
            let target = sim.elapsed() + *by;
            let outcomes = sim.advance(*by);
            match model.in_flight.take() {
                Some((name, deadline)) if deadline <= target => {
                    if outcomes.len() != 1 || outcomes[0].name != name {
                        found.push((
                            InvariantCheck::EventsMatchTransitions,
                            format!("expected one outcome for `{name}`, got {outcomes:?}"),
                        ));
                    }
                    if let Some(outcome) = outcomes.first() {
                        let at = u64::try_from(outcome.completed_at.timestamp_millis()).ok();
                        let due = u64::try_from(deadline.as_millis()).ok();
                        if at != due {
                            found.push((
                                InvariantCheck::CompletionAtDeadline,
                                format!("completed at {at:?}ms, due at {due:?}ms"),
                            ));
                        }
                        expected_events.push(outcome.to_event());
                    }
                }
                still_pending => {
                    if !outcomes.is_empty() {
                        found.push((
                            InvariantCheck::CompletionAtDeadline,
                            format!("unexpected outcomes {outcomes:?}"),
                        ));
                    }
                    model.in_flight = still_pending;
                }
            }
        }
        Step::Cancel => {
            let cancelled = sim.cancel();
            match (model.in_flight.take(), cancelled) {
                (Some((name, _)), Some(request)) if request.name() == name => {
                    expected_events.push(FlightEvent::Cancelled { name });
                }
                (None, None) => {}
                (expected, actual) => found.push((
                    InvariantCheck::EventsMatchTransitions,
                    format!("cancel returned {actual:?}, model had {expected:?}"),
                )),
            }
        }
    }

    if sim.observer().events() != expected_events.as_slice() {
        found.push((
            InvariantCheck::EventsMatchTransitions,
            format!(
                "delivered {:?}, expected {expected_events:?}",
                sim.observer().events()
            ),
        ));
    }

    found
}

/// Compare one submit result against the phase the model expects
///
/// Returns the event the observer should have seen, if any.
fn check_submit(
    name: &str,
    busy_with: Option<String>,
    result: Result<Accepted, Rejected>,
    delay: DelayRange,
) -> (Option<FlightEvent>, Vec<(InvariantCheck, String)>) {
    let mut found = Vec::new();
    let event = match (busy_with, result) {
        (Some(_), Err(rejected)) => {
            if rejected.name != name {
                found.push((
                    InvariantCheck::SubmitMatchesPhase,
                    format!("rejection names `{}`", rejected.name),
                ));
            }
            Some(FlightEvent::Rejected { name: name.to_owned() })
        }
        (None, Ok(accepted)) => {
            let ms = u64::try_from(accepted.delay.as_millis()).unwrap_or(u64::MAX);
            if !delay.contains(ms) {
                found.push((
                    InvariantCheck::DelayWithinRange,
                    format!("delay {ms}ms outside {delay:?}"),
                ));
            }
            Some(FlightEvent::Accepted { name: name.to_owned() })
        }
        (Some(busy), Ok(_)) => {
            found.push((
                InvariantCheck::SubmitMatchesPhase,
                format!("accepted while `{busy}` in flight"),
            ));
            None
        }
        (None, Err(rejected)) => {
            found.push((
                InvariantCheck::SubmitMatchesPhase,
                format!("rejected while idle: {rejected}"),
            ));
            None
        }
    };
    (event, found)
}

fn check_state(sim: &Checked, model: &Model) -> Vec<(InvariantCheck, String)> {
    let mut found = Vec::new();
    if !sim.is_consistent() {
        found.push((
            InvariantCheck::BusyMatchesTimer,
            format!(
                "phase {:?} with {} armed timers",
                sim.phase(),
                sim.scheduler().pending()
            ),
        ));
    }
    if sim.phase() != model.phase() {
        found.push((
            InvariantCheck::PhaseMatchesModel,
            format!("controller {:?}, model {:?}", sim.phase(), model.phase()),
        ));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimerId;

    #[test]
    fn default_run_passes() {
        let report = run_harness(HarnessConfig {
            total_steps: 2_000,
            ..HarnessConfig::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert!(report.stats.accepted > 0);
        assert!(report.stats.rejected > 0);
        assert_eq!(report.stats.cancelled, 0);
    }

    #[test]
    fn same_seed_same_report() {
        let config = HarnessConfig {
            total_steps: 500,
            ..HarnessConfig::default()
        };
        let a = run_harness(config.clone());
        let b = run_harness(config);
        assert_eq!(a.stats.accepted, b.stats.accepted);
        assert_eq!(a.stats.succeeded, b.stats.succeeded);
        assert_eq!(a.final_elapsed, b.final_elapsed);
    }

    fn accepted(name: &str, delay_ms: u64) -> Result<Accepted, Rejected> {
        Ok(Accepted {
            name: name.to_owned(),
            timer: TimerId(7),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[test]
    fn accept_while_busy_is_flagged() {
        let (event, found) = check_submit(
            "Soda",
            Some("Pizza".to_owned()),
            accepted("Soda", 1_500),
            DelayRange::default(),
        );
        assert_eq!(event, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, InvariantCheck::SubmitMatchesPhase);
        assert_eq!(found[0].1, "accepted while `Pizza` in flight");
    }

    #[test]
    fn reject_while_idle_is_flagged() {
        let rejected = Err(Rejected {
            name: "Soda".into(),
            in_flight: "Pizza".into(),
        });
        let (event, found) = check_submit("Soda", None, rejected, DelayRange::default());
        assert_eq!(event, None);
        assert_eq!(found[0].0, InvariantCheck::SubmitMatchesPhase);
    }

    #[test]
    fn accepted_delay_outside_range_is_flagged() {
        let range = DelayRange::default();
        let (event, found) = check_submit("Pizza", None, accepted("Pizza", 50), range);
        assert_eq!(event, Some(FlightEvent::Accepted { name: "Pizza".into() }));
        assert_eq!(found[0].0, InvariantCheck::DelayWithinRange);

        let (_, clean) = check_submit("Pizza", None, accepted("Pizza", 1_000), range);
        assert!(clean.is_empty());
    }
}
