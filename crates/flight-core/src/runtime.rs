//! Real-time event loop
//!
//! A single task multiplexes user commands and the completion timer with
//! `tokio::select!`. Submits and completions are handled one at a time on the
//! same task, which is the whole concurrency model of the controller.

use crate::observer::Observer;
use crate::ports::{RandomSource, TokioScheduler};
use crate::simulator::SingleFlightSimulator;
use crate::types::OperationRequest;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Input forwarded by a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Submit an operation with this name
    Submit(String),
    /// Abandon the in-flight operation
    Cancel,
}

/// Drive `sim` until `commands` closes and nothing is in flight
///
/// Closing the channel does not abort an accepted operation; the loop waits
/// for its completion before handing the simulator back.
pub async fn drive<R, O>(
    mut sim: SingleFlightSimulator<TokioScheduler, R, O>,
    mut commands: mpsc::Receiver<Command>,
) -> SingleFlightSimulator<TokioScheduler, R, O>
where
    R: RandomSource,
    O: Observer,
{
    let mut open = true;
    loop {
        if !open && !sim.is_busy() {
            break;
        }
        let deadline = sim.scheduler().next_deadline();

        tokio::select! {
            biased;

            // Due completions drain before the next command is looked at.
            () = sleep_until(deadline) => {
                sim.poll_timers();
            }
            command = commands.recv(), if open => match command {
                Some(Command::Submit(name)) => match OperationRequest::new(name) {
                    Ok(request) => {
                        if let Err(rejected) = sim.submit(request) {
                            tracing::debug!(%rejected, "Submit dropped");
                        }
                    }
                    Err(err) => tracing::warn!(%err, "Skipping invalid operation"),
                },
                Some(Command::Cancel) => {
                    if sim.cancel().is_none() {
                        tracing::debug!("Nothing in flight to cancel");
                    }
                }
                None => {
                    tracing::debug!("Command channel closed");
                    open = false;
                }
            },
        }
    }
    sim
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
