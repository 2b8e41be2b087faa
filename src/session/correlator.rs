//! Request id assignment and the single pending-request flag.
//!
//! Correlation is deliberately weak: the flag records that *some* request
//! is outstanding, not which one. Replies are not matched against the id
//! they carry.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// RequestCorrelator
// ============================================================================

/// Issues request ids and tracks whether a request awaits an answer.
#[derive(Debug)]
pub struct RequestCorrelator {
    /// Next id to hand out.
    next: u64,
    /// Outstanding request and when it was sent.
    pending: Option<(RequestId, Instant)>,
    /// Age at which an outstanding request counts as stuck.
    timeout: Duration,
}

impl RequestCorrelator {
    /// Creates a correlator starting at id `0`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            next: 0,
            pending: None,
            timeout,
        }
    }

    /// Returns the next id without touching the pending flag.
    ///
    /// Used for heartbeat traffic.
    pub fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next);
        self.next += 1;
        id
    }

    /// Starts a request that expects an answer and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StuckRequest`] if an earlier request is still
    /// outstanding and older than the timeout. No id is consumed then.
    pub fn begin_request(&mut self, now: Instant) -> Result<RequestId> {
        self.check_stuck(now)?;

        let id = self.next_id();
        self.pending = Some((id, now));
        Ok(id)
    }

    /// Checks the outstanding request, if any, against the timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StuckRequest`] if it is older than the timeout.
    pub fn check_stuck(&self, now: Instant) -> Result<()> {
        if let Some((id, sent_at)) = self.pending {
            let elapsed = now.saturating_duration_since(sent_at);
            if elapsed > self.timeout {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                return Err(Error::stuck_request(id, elapsed_ms));
            }
        }
        Ok(())
    }

    /// Clears the pending flag.
    #[inline]
    pub fn complete_request(&mut self) {
        self.pending = None;
    }

    /// Returns `true` while a request is outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Restarts ids at `0` and clears the pending flag.
    pub fn reset(&mut self) {
        self.next = 0;
        self.pending = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn test_ids_are_gapless_from_zero() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        let now = Instant::now();

        assert_eq!(correlator.next_id(), RequestId::new(0));
        assert_eq!(correlator.begin_request(now).expect("begin"), RequestId::new(1));
        assert_eq!(correlator.next_id(), RequestId::new(2));
    }

    #[test]
    fn test_reset_restarts_at_zero() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        let now = Instant::now();
        correlator.next_id();
        correlator.begin_request(now).expect("begin");

        correlator.reset();
        assert!(!correlator.is_pending());
        assert_eq!(correlator.next_id(), RequestId::new(0));
    }

    #[test]
    fn test_complete_clears_flag() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        correlator.begin_request(Instant::now()).expect("begin");
        assert!(correlator.is_pending());
        correlator.complete_request();
        assert!(!correlator.is_pending());
    }

    #[test]
    fn test_pending_within_timeout_is_not_stuck() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        let start = Instant::now();
        correlator.begin_request(start).expect("begin");

        let id = correlator
            .begin_request(start + TIMEOUT)
            .expect("exactly at the timeout is still fine");
        assert_eq!(id, RequestId::new(1));
    }

    #[test]
    fn test_stuck_request_detected() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        let start = Instant::now();
        correlator.begin_request(start).expect("begin");

        let err = correlator
            .begin_request(start + Duration::from_secs(31))
            .expect_err("should be stuck");
        match err {
            Error::StuckRequest {
                request_id,
                elapsed_ms,
            } => {
                assert_eq!(request_id, RequestId::new(0));
                assert_eq!(elapsed_ms, 31_000);
            }
            other => panic!("unexpected error: {other}"),
        }

        // No id was consumed by the failed attempt
        assert_eq!(correlator.next_id(), RequestId::new(1));
    }

    #[test]
    fn test_check_stuck_leaves_pending_untouched() {
        let mut correlator = RequestCorrelator::new(TIMEOUT);
        let start = Instant::now();
        correlator.check_stuck(start).expect("nothing pending");
        correlator.begin_request(start).expect("begin");

        correlator.check_stuck(start + TIMEOUT).expect("not stuck yet");
        assert!(matches!(
            correlator.check_stuck(start + Duration::from_secs(45)),
            Err(Error::StuckRequest { elapsed_ms: 45_000, .. })
        ));
        assert!(correlator.is_pending());
    }
}
