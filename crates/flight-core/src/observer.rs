//! Observer interface for controller notifications

use crate::types::FlightEvent;

/// Receives every accepted/rejected/completed notification
///
/// Observers are owned by the simulator and notified while it is mutably
/// borrowed, so they can never call back into `submit`.
pub trait Observer {
    fn notify(&mut self, event: &FlightEvent);
}

impl<F> Observer for F
where
    F: FnMut(&FlightEvent),
{
    fn notify(&mut self, event: &FlightEvent) {
        self(event);
    }
}

/// Fan-out: `A` first, then `B`
#[derive(Debug, Clone, Default)]
pub struct Fanout<A, B>(pub A, pub B);

impl<A: Observer, B: Observer> Observer for Fanout<A, B> {
    fn notify(&mut self, event: &FlightEvent) {
        self.0.notify(event);
        self.1.notify(event);
    }
}

/// Keeps delivered events in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<FlightEvent>,
}

impl RecordingObserver {
    /// Empty recorder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in delivery order
    #[inline]
    #[must_use]
    pub fn events(&self) -> &[FlightEvent] {
        &self.events
    }

    /// Take and clear the recorded events
    pub fn drain(&mut self) -> Vec<FlightEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of recorded events with the given wire kind
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

impl Observer for RecordingObserver {
    fn notify(&mut self, event: &FlightEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_notifies_in_order() {
        let mut seen = Vec::new();
        {
            let first = |e: &FlightEvent| seen.push(format!("a:{}", e.name()));
            let mut pair = Fanout(first, RecordingObserver::new());
            pair.notify(&FlightEvent::Accepted { name: "Pizza".into() });
            assert_eq!(pair.1.count("accepted"), 1);
        }
        assert_eq!(seen, vec!["a:Pizza".to_string()]);
    }
}
