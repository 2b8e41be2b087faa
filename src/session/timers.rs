//! Session timers.
//!
//! The session owns two timers: the periodic heartbeat check and the
//! one-shot reconnect delay. Both only post a [`TimerInput`] back to the
//! session; all state changes happen on the session task.
//!
//! The heartbeat timer is cancelled through its handle on every teardown.
//! A scheduled reconnect cannot be cancelled; opening is guarded by state.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::trace;

use crate::identifiers::ConnectionId;

// ============================================================================
// TimerInput
// ============================================================================

/// Input posted by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInput {
    /// Heartbeat period elapsed for the given connection.
    HeartbeatTick {
        /// Connection the heartbeat timer was started for.
        connection: ConnectionId,
    },
    /// Reconnect delay elapsed.
    ReconnectDue,
}

// ============================================================================
// Timers
// ============================================================================

/// Timer facility used by the session state machine.
pub trait Timers: Send {
    /// Cancellation handle of a heartbeat timer.
    type Handle: Send;

    /// Starts posting `HeartbeatTick` every `period`, first tick after one period.
    fn start_heartbeat(&mut self, period: Duration, connection: ConnectionId) -> Self::Handle;

    /// Stops a heartbeat timer.
    fn cancel(&mut self, handle: Self::Handle);

    /// Posts `ReconnectDue` once after `delay`.
    fn schedule_reconnect(&mut self, delay: Duration);
}

// ============================================================================
// TokioTimers
// ============================================================================

/// [`Timers`] backed by spawned tokio tasks.
pub struct TokioTimers {
    inputs: mpsc::UnboundedSender<TimerInput>,
}

impl TokioTimers {
    /// Creates timers posting to `inputs`.
    #[must_use]
    pub fn new(inputs: mpsc::UnboundedSender<TimerInput>) -> Self {
        Self { inputs }
    }
}

impl Timers for TokioTimers {
    type Handle = JoinHandle<()>;

    fn start_heartbeat(&mut self, period: Duration, connection: ConnectionId) -> Self::Handle {
        let inputs = self.inputs.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                trace!(%connection, "Heartbeat tick");
                if inputs.send(TimerInput::HeartbeatTick { connection }).is_err() {
                    break;
                }
            }
        })
    }

    fn cancel(&mut self, handle: Self::Handle) {
        handle.abort();
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        let inputs = self.inputs.clone();

        tokio::spawn(async move {
            sleep(delay).await;
            let _ = inputs.send(TimerInput::ReconnectDue);
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
