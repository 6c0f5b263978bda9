//! Error types for the single-flight controller
//!
//! The controller itself only ever produces [`Rejected`]. A simulated
//! failure is a normal [`OperationOutcome`](crate::types::OperationOutcome)
//! with `succeeded == false`, not an error.

use crate::types::Phase;
use std::path::PathBuf;

/// Umbrella error for everything the crate can report
#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    /// Submit while another operation is in flight
    #[error(transparent)]
    Rejected(#[from] Rejected),

    /// Malformed operation request
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Controller attempted an illegal phase change
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),
}

impl FlightError {
    /// Whether the caller can simply try again later
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Rejected(_) | Self::Request(_) => true,
            Self::Config(_) | Self::StateMachine(_) => false,
        }
    }
}

/// A submit arrived while the controller was busy
///
/// Synchronous and never retried; the request is dropped, not enqueued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation `{name}` rejected: `{in_flight}` is still in flight")]
pub struct Rejected {
    /// Name of the rejected request
    pub name: String,
    /// Name of the operation currently holding the controller
    pub in_flight: String,
}

/// Operation request validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Name is empty or only whitespace
    #[error("operation name must not be empty")]
    EmptyName,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Lower delay bound above the upper bound
    #[error("invalid delay range: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },

    /// Success probability outside [0, 1] or not finite
    #[error("success probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not present in the allowed matrix
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: Phase, to: Phase },
}
