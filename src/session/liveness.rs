//! Heartbeat bookkeeping and staleness detection.
//!
//! Any decoded inbound frame proves the connection is alive. Only a `PONG`
//! resets the missed-heartbeat counter.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::Instant;

use crate::protocol::HEARTBEAT_SENTINEL;

// ============================================================================
// LivenessVerdict
// ============================================================================

/// Outcome of one periodic liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessVerdict {
    /// Recent inbound traffic, nothing to do.
    Fresh,
    /// Stale; a heartbeat probe should be sent.
    Probe {
        /// Missed probes including this one.
        missed: u32,
    },
    /// Too many probes went unanswered.
    Dead {
        /// Missed probes at the time of the verdict.
        missed: u32,
    },
}

// ============================================================================
// LivenessMonitor
// ============================================================================

/// Tracks the last inbound frame and consecutive unanswered probes.
#[derive(Debug)]
pub struct LivenessMonitor {
    last_inbound: Instant,
    missed: u32,
    freshness: Duration,
    max_missed: u32,
}

impl LivenessMonitor {
    /// Creates a monitor that treats `now` as the last sign of life.
    #[must_use]
    pub fn new(freshness: Duration, max_missed: u32, now: Instant) -> Self {
        Self {
            last_inbound: now,
            missed: 0,
            freshness,
            max_missed,
        }
    }

    /// Records an inbound frame.
    #[inline]
    pub fn observe_inbound(&mut self, now: Instant) {
        self.last_inbound = now;
    }

    /// Records a `PONG` and resets the counter.
    ///
    /// Returns `true` if the payload echoed the probe sentinel.
    pub fn pong_received(&mut self, payload: Option<&Value>) -> bool {
        self.missed = 0;
        payload.and_then(Value::as_u64) == Some(HEARTBEAT_SENTINEL)
    }

    /// Runs one periodic check.
    pub fn check(&mut self, now: Instant) -> LivenessVerdict {
        if now.saturating_duration_since(self.last_inbound) < self.freshness {
            return LivenessVerdict::Fresh;
        }

        if self.missed >= self.max_missed {
            return LivenessVerdict::Dead {
                missed: self.missed,
            };
        }

        self.missed += 1;
        LivenessVerdict::Probe {
            missed: self.missed,
        }
    }

    /// Starts over for a fresh connection.
    pub fn reset(&mut self, now: Instant) {
        self.last_inbound = now;
        self.missed = 0;
    }

    /// Returns the number of consecutive unanswered probes.
    #[inline]
    #[must_use]
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Returns the payload carried by heartbeat probes.
    #[inline]
    #[must_use]
    pub fn probe_payload() -> Value {
        json!(HEARTBEAT_SENTINEL)
    }
}

// ============================================================================
// Tests
// ============================================================================
