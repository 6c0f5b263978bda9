//! Structured logging
//!
//! The controller logs through `tracing`; binaries install a subscriber with
//! [`init`]. [`TracingObserver`] mirrors observer events into the same log.

use crate::observer::Observer;
use crate::types::FlightEvent;
use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice is
/// harmless; the second call is ignored.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Observer that logs every event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&mut self, event: &FlightEvent) {
        match event {
            FlightEvent::Rejected { name } => {
                tracing::warn!(kind = event.kind(), %name, "Operation rejected");
            }
            FlightEvent::Failed { name, completed_at } => {
                tracing::info!(kind = event.kind(), %name, %completed_at, "Operation failed");
            }
            FlightEvent::Succeeded { name, completed_at } => {
                tracing::info!(kind = event.kind(), %name, %completed_at, "Operation succeeded");
            }
            FlightEvent::Accepted { name } | FlightEvent::Cancelled { name } => {
                tracing::info!(kind = event.kind(), %name, "Operation {}", event.kind());
            }
        }
    }
}
