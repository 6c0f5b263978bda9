//! Status reporter: turns observer events into status-bar lines

use crate::observer::Observer;
use crate::types::FlightEvent;
use std::io::Write;

/// Output format of [`StatusReporter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFormat {
    /// Human-readable status line
    #[default]
    Text,
    /// One JSON object per line, `{"kind": ..., "name": ...}`
    Json,
}

/// Human-readable status line for an event
#[must_use]
pub fn render(event: &FlightEvent) -> String {
    match event {
        FlightEvent::Accepted { name } => format!("Requesting {name}..."),
        FlightEvent::Rejected { name } => {
            format!("Busy: {name} ignored, a request is already in progress")
        }
        FlightEvent::Succeeded { name, completed_at } => {
            format!("{name} succeeded at {}", completed_at.format("%H:%M:%S%.3f"))
        }
        FlightEvent::Failed { name, completed_at } => {
            format!("{name} failed at {}", completed_at.format("%H:%M:%S%.3f"))
        }
        FlightEvent::Cancelled { name } => format!("{name} cancelled"),
    }
}

/// Observer writing one status line per event
#[derive(Debug)]
pub struct StatusReporter<W> {
    out: W,
    format: StatusFormat,
}

impl<W: Write> StatusReporter<W> {
    /// Reporter writing to `out`
    #[must_use]
    pub fn new(out: W, format: StatusFormat) -> Self {
        Self { out, format }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, event: &FlightEvent) -> String {
        match self.format {
            StatusFormat::Text => render(event),
            StatusFormat::Json => serde_json::to_string(event).unwrap_or_else(|err| {
                tracing::warn!(%err, "Failed to encode status event");
                render(event)
            }),
        }
    }
}

impl<W: Write> Observer for StatusReporter<W> {
    fn notify(&mut self, event: &FlightEvent) {
        let line = self.line(event);
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(%err, "Failed to write status line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[test]
    fn text_lines() {
        let at = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(
            render(&FlightEvent::Accepted { name: "Pizza".into() }),
            "Requesting Pizza..."
        );
        assert_eq!(
            render(&FlightEvent::Succeeded { name: "Pizza".into(), completed_at: at }),
            "Pizza succeeded at 00:00:00.000"
        );
        assert_eq!(
            render(&FlightEvent::Failed { name: "Soda".into(), completed_at: at }),
            "Soda failed at 00:00:00.000"
        );
    }

    struct BrokenPipe {
        attempts: usize,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_do_not_interrupt_notification() {
        let mut reporter = StatusReporter::new(BrokenPipe { attempts: 0 }, StatusFormat::Text);
        reporter.notify(&FlightEvent::Accepted { name: "Pizza".into() });
        reporter.notify(&FlightEvent::Cancelled { name: "Pizza".into() });
        assert_eq!(reporter.into_inner().attempts, 2);
    }

    #[test]
    fn json_lines() {
        let mut reporter = StatusReporter::new(Vec::new(), StatusFormat::Json);
        reporter.notify(&FlightEvent::Rejected { name: "Soda".into() });
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "{\"kind\":\"rejected\",\"name\":\"Soda\"}\n");
    }
}
