//! Testing utilities for the single-flight workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use flight_core::observer::RecordingObserver;
use flight_core::ports::{RandomSource, SeededRandom, VirtualScheduler};
use flight_core::{FlightEvent, OperationRequest, SimulatorConfig, SingleFlightSimulator};
use std::collections::VecDeque;

/// Random source replaying scripted draws
///
/// Delays and unit draws are consumed front to back; once a script runs dry
/// the fallback value is used (`min` for delays).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    delays: VecDeque<u64>,
    units: VecDeque<f64>,
    fallback_unit: f64,
}

impl ScriptedRandom {
    /// Script with no delays or units
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays returned by `uniform_ms`, clamped into the requested range
    pub fn with_delays(mut self, delays: impl IntoIterator<Item = u64>) -> Self {
        self.delays.extend(delays);
        self
    }

    /// Values returned by `unit`
    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    /// Value returned by `unit` once the script is exhausted
    pub fn with_fallback_unit(mut self, unit: f64) -> Self {
        self.fallback_unit = unit;
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform_ms(&mut self, min: u64, max: u64) -> u64 {
        self.delays.pop_front().map_or(min, |d| d.clamp(min, max))
    }

    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }
}

/// Simulator fixture on virtual time
pub type VirtualSim<R = SeededRandom> =
    SingleFlightSimulator<VirtualScheduler, R, RecordingObserver>;

/// Simulator on virtual time with a recording observer
pub fn virtual_sim<R: RandomSource>(config: SimulatorConfig, random: R) -> VirtualSim<R> {
    SingleFlightSimulator::new(config, VirtualScheduler::new(), random, RecordingObserver::new())
        .expect("test configuration must be valid")
}

/// Fixed delay, fixed probability, seeded randomness
pub fn fixed_sim(delay_ms: u64, success_probability: f64) -> VirtualSim {
    virtual_sim(
        SimulatorConfig::new()
            .with_fixed_delay(delay_ms)
            .with_success_probability(success_probability),
        SeededRandom::from_seed(1234),
    )
}

/// Valid request named `name`
pub fn request(name: &str) -> OperationRequest {
    OperationRequest::new(name).expect("fixture names are non-empty")
}

/// `(kind, name)` pairs of recorded events, ignoring timestamps
pub fn kinds_and_names(events: &[FlightEvent]) -> Vec<(&'static str, String)> {
    events
        .iter()
        .map(|e| (e.kind(), e.name().to_string()))
        .collect()
}
