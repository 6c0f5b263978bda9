//! Data model of the single-flight controller

use crate::error::RequestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A named simulated operation (e.g. a menu item)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationRequest {
    name: String,
}

impl OperationRequest {
    /// Create a request, rejecting empty or whitespace-only names
    ///
    /// # Errors
    /// - `RequestError::EmptyName` if `name` has no visible characters
    pub fn new(name: impl Into<String>) -> Result<Self, RequestError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RequestError::EmptyName);
        }
        Ok(Self { name })
    }

    /// Operation name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the request, returning its name
    #[inline]
    #[must_use]
    pub fn into_name(self) -> String {
        self.name
    }
}

impl fmt::Display for OperationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Opaque handle of a scheduled completion timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Controller phase without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Ready to accept a submit
    Idle,
    /// An operation is in flight
    Busy,
}

/// The operation currently holding the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Accepted request
    pub request: OperationRequest,
    /// Armed completion timer
    pub timer: TimerId,
    /// Delay drawn at acceptance
    pub delay: Duration,
}

/// Full controller state; `Busy` carries the in-flight request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Holding one accepted operation
    Busy(InFlight),
}

impl ControllerState {
    /// Phase discriminant
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Busy(_) => Phase::Busy,
        }
    }

    /// In-flight operation, if any
    #[must_use]
    pub fn in_flight(&self) -> Option<&InFlight> {
        match self {
            Self::Idle => None,
            Self::Busy(in_flight) => Some(in_flight),
        }
    }
}

/// Returned by a successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// Name of the accepted operation
    pub name: String,
    /// Completion timer armed for it
    pub timer: TimerId,
    /// Delay drawn for this operation
    pub delay: Duration,
}

/// Terminal result of a completed simulated operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    /// Name of the completed operation
    pub name: String,
    /// Drawn outcome
    pub succeeded: bool,
    /// Clock reading at completion
    pub completed_at: DateTime<Utc>,
}

impl OperationOutcome {
    /// Observer event for this outcome
    #[must_use]
    pub fn to_event(&self) -> FlightEvent {
        if self.succeeded {
            FlightEvent::Succeeded {
                name: self.name.clone(),
                completed_at: self.completed_at,
            }
        } else {
            FlightEvent::Failed {
                name: self.name.clone(),
                completed_at: self.completed_at,
            }
        }
    }
}

/// Notification delivered to observers on every transition or rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FlightEvent {
    /// Controller went Idle -> Busy
    Accepted { name: String },
    /// Submit while Busy; state unchanged
    Rejected { name: String },
    /// Completed with a successful outcome; controller is Idle again
    Succeeded {
        name: String,
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
    /// Completed with a failed outcome; controller is Idle again
    Failed {
        name: String,
        #[serde(rename = "completedAt")]
        completed_at: DateTime<Utc>,
    },
    /// In-flight operation was cancelled explicitly
    Cancelled { name: String },
}

impl FlightEvent {
    /// Name of the operation the event concerns
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Accepted { name }
            | Self::Rejected { name }
            | Self::Succeeded { name, .. }
            | Self::Failed { name, .. }
            | Self::Cancelled { name } => name,
        }
    }

    /// Wire tag of the event
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Phase the controller is in once this event has been delivered
    ///
    /// `None` for rejections, which never change state. Views use this to
    /// enable or disable their triggers.
    #[must_use]
    pub fn phase_after(&self) -> Option<Phase> {
        match self {
            Self::Accepted { .. } => Some(Phase::Busy),
            Self::Rejected { .. } => None,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Cancelled { .. } => {
                Some(Phase::Idle)
            }
        }
    }

    /// Whether the event ends an accepted operation
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}
