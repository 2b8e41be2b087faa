//! In-memory doubles for driving the session machine in unit tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::identifiers::ConnectionId;
use crate::protocol::{OutboundEnvelope, ServerAction};
use crate::transport::{Transport, TransportEvent};

use super::machine::SessionMachine;
use super::state::ConnectionState;
use super::timers::{TimerInput, Timers};

// ============================================================================
// RecordingTransport
// ============================================================================

/// Transport that records every call.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    opened: Vec<ConnectionId>,
    sent: Vec<String>,
    closes: usize,
}

impl RecordingTransport {
    pub fn opened(&self) -> &[ConnectionId] {
        &self.opened
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl Transport for RecordingTransport {
    fn open(&mut self, connection: ConnectionId) {
        self.opened.push(connection);
    }

    fn send(&mut self, frame: String) {
        self.sent.push(frame);
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

// ============================================================================
// ManualTimers
// ============================================================================

/// Timers that never fire on their own.
#[derive(Debug, Default)]
pub struct ManualTimers {
    next_handle: u64,
    active: Vec<(u64, ConnectionId)>,
    reconnects: Vec<Duration>,
}

impl ManualTimers {
    pub fn active_heartbeats(&self) -> usize {
        self.active.len()
    }

    pub fn reconnects(&self) -> Vec<Duration> {
        self.reconnects.clone()
    }
}

impl Timers for ManualTimers {
    type Handle = u64;

    fn start_heartbeat(&mut self, _period: Duration, connection: ConnectionId) -> u64 {
        self.next_handle += 1;
        self.active.push((self.next_handle, connection));
        self.next_handle
    }

    fn cancel(&mut self, handle: u64) {
        self.active.retain(|(h, _)| *h != handle);
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.reconnects.push(delay);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A machine wired to recording doubles with a hand-driven clock.
pub struct Harness {
    pub machine: SessionMachine<RecordingTransport, ManualTimers>,
    pub store: Arc<MemoryCredentialStore>,
    pub now: Instant,
    states: Arc<Mutex<Vec<ConnectionState>>>,
}

impl Harness {
    pub fn new(token: Option<&str>) -> Self {
        let store = Arc::new(match token {
            Some(token) => MemoryCredentialStore::with_token(token),
            None => MemoryCredentialStore::new(),
        });
        let now = Instant::now();
        let config = SessionConfig::new("localhost", false).expect("config");

        let mut machine = SessionMachine::new(
            config,
            RecordingTransport::default(),
            ManualTimers::default(),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            now,
        );

        let states = Arc::new(Mutex::new(vec![ConnectionState::Closed]));
        let log = Arc::clone(&states);
        machine.on_state_change(Box::new(move |_, to| log.lock().push(to)));

        Self {
            machine,
            store,
            now,
            states,
        }
    }

    /// Counts deliveries of `action` to subscribers.
    pub fn count(&mut self, action: ServerAction) -> Arc<Mutex<usize>> {
        let counter = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&counter);
        self.machine
            .subscribe(action, Box::new(move |_| *sink.lock() += 1));
        counter
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    pub fn opened(&mut self) {
        let event = TransportEvent::opened(self.machine.connection());
        self.machine.handle(event.into(), self.now);
    }

    pub fn closed(&mut self, reason: &str) {
        let event = TransportEvent::closed(self.machine.connection(), reason);
        self.machine.handle(event.into(), self.now);
    }

    pub fn receive(&mut self, frame: &str) {
        let event = TransportEvent::message(self.machine.connection(), frame);
        self.machine.handle(event.into(), self.now);
    }

    /// Advances the clock by `period` and fires the heartbeat timer.
    pub fn tick(&mut self, period: Duration) {
        self.advance(period);
        let input = TimerInput::HeartbeatTick {
            connection: self.machine.connection(),
        };
        self.machine.handle(input.into(), self.now);
    }

    pub fn reconnect(&mut self) {
        self.machine.handle(TimerInput::ReconnectDue.into(), self.now);
    }

    /// Every envelope written so far, decoded.
    pub fn sent(&self) -> Vec<OutboundEnvelope> {
        self.machine
            .transport()
            .sent()
            .iter()
            .map(|frame| OutboundEnvelope::decode(frame).expect("valid envelope"))
            .collect()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().clone()
    }

    pub fn transport(&self) -> &RecordingTransport {
        self.machine.transport()
    }

    pub fn timers(&self) -> &ManualTimers {
        self.machine.timers()
    }
}
