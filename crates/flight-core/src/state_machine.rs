//! Allowed controller phase changes

use crate::error::StateMachineError;
use crate::types::Phase;

/// Validates a controller phase change.
///
/// The controller only ever moves `Idle -> Busy` on an accepted submit and
/// `Busy -> Idle` on completion or cancellation. Anything else is a bug in the
/// controller; the `strict-debug` feature turns it into a panic.
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        return Ok(());
    }
    if cfg!(feature = "strict-debug") {
        panic!("Illegal state transition attempted: {from:?} -> {to:?}");
    }
    Err(StateMachineError::IllegalTransition { from, to })
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    match from {
        Phase::Idle => vec![Phase::Busy],
        Phase::Busy => vec![Phase::Idle],
    }
}

fn allowed(from: Phase, to: Phase) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(all(test, not(feature = "strict-debug")))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn idle_and_busy_alternate() {
        assert!(validate_transition(Phase::Idle, Phase::Busy).is_ok());
        assert!(validate_transition(Phase::Busy, Phase::Idle).is_ok());

        assert_eq!(
            validate_transition(Phase::Busy, Phase::Busy),
            Err(StateMachineError::IllegalTransition {
                from: Phase::Busy,
                to: Phase::Busy
            })
        );
        assert!(validate_transition(Phase::Idle, Phase::Idle).is_err());
    }

    proptest! {
        #[test]
        fn prop_validation_matches_matrix(
            from in prop_oneof![Just(Phase::Idle), Just(Phase::Busy)],
            to in prop_oneof![Just(Phase::Idle), Just(Phase::Busy)],
        ) {
            let res = validate_transition(from, to);
            prop_assert_eq!(res.is_ok(), allowed_transitions(from).contains(&to));
        }
    }
}
