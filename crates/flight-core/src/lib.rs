//! Flight Core - single-flight simulated request controller
//!
//! Guarantees at most one pending simulated operation at a time:
//! 1. **Submit**: an idle controller accepts a named operation and schedules
//!    its completion after a randomized delay
//! 2. **Complete**: when the timer fires, a success/failure outcome is drawn
//!    and delivered to the observer, and the controller returns to idle
//!
//! Requests arriving while an operation is in flight are rejected, never
//! queued.
//!
//! # Quick Start
//!
//! ```rust
//! use flight_core::prelude::*;
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::new()
//!     .with_fixed_delay(1500)
//!     .with_success_probability(1.0);
//! let mut sim = SingleFlightSimulator::new(
//!     config,
//!     VirtualScheduler::new(),
//!     SeededRandom::from_seed(7),
//!     RecordingObserver::new(),
//! )?;
//!
//! sim.submit(OperationRequest::new("Pizza")?)?;
//! assert!(sim.submit(OperationRequest::new("Soda")?).is_err());
//!
//! let outcomes = sim.advance(Duration::from_millis(1500));
//! assert!(outcomes[0].succeeded);
//! # Ok::<(), flight_core::FlightError>(())
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod observer;
pub mod ports;
pub mod simulator;
pub mod state_machine;
pub mod types;

// Presentation and drivers
pub mod logging;
pub mod runtime;
pub mod status;

// Test harness
pub mod test_harness;

// Re-exports
pub use config::{DelayRange, SimulatorConfig};
pub use error::*;
pub use simulator::SingleFlightSimulator;
pub use types::*;

/// Common imports for driving a simulator
pub mod prelude {
    pub use crate::config::{DelayRange, SimulatorConfig};
    pub use crate::error::{ConfigError, FlightError, Rejected, RequestError};
    pub use crate::observer::{Observer, RecordingObserver};
    pub use crate::ports::{
        Clock, RandomSource, Scheduler, SeededRandom, TokioScheduler, VirtualScheduler,
    };
    pub use crate::simulator::SingleFlightSimulator;
    pub use crate::types::{
        Accepted, ControllerState, FlightEvent, InFlight, OperationOutcome, OperationRequest,
        Phase, TimerId,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
#[must_use]
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
