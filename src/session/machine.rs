//! Session state machine.
//!
//! [`SessionMachine`] is the sans-IO core of the session. It owns the
//! connection state, the credential token, the correlator, the liveness
//! monitor, the dispatcher and the heartbeat timer handle. It is driven by
//! [`SessionInput`]s and by the public operations, one at a time, and talks
//! to the outside world only through a [`Transport`] and [`Timers`].
//!
//! # Lifecycle
//!
//! | Trigger | Effect |
//! |---------|--------|
//! | `open()` | `Closed → Opening`, new connection generation |
//! | transport opened | `Opening → Open`, heartbeat started, auto-login if a token is cached |
//! | `login()` | `Open → Authenticating`, one `LOGIN` envelope |
//! | `LOGGED_IN` | `Authenticating → Authenticated`, `LOGGED_IN` published once |
//! | teardown | any → `Closed`, heartbeat cancelled, reconnect scheduled |
//!
//! Teardown causes: transport close, dead connection, stuck request,
//! explicit logout. Each input re-checks the current state instead of
//! assuming the state that existed when the triggering action was issued.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::SessionConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{ClientAction, InboundEnvelope, OutboundEnvelope, ServerAction};
use crate::transport::{Transport, TransportEvent, TransportEventKind};

use super::correlator::RequestCorrelator;
use super::dispatcher::{EventDispatcher, EventHandler};
use super::liveness::{LivenessMonitor, LivenessVerdict};
use super::state::ConnectionState;
use super::timers::{TimerInput, Timers};

// ============================================================================
// Constants
// ============================================================================

/// Reason attached to a user-initiated logout.
pub const LOGOUT_REASON: &str = "Logged out by user.";

/// Reason attached to a dead-connection teardown.
pub const TIMED_OUT_REASON: &str = "Socket connection timed out.";

/// Reason attached to a stuck-request teardown.
pub const STUCK_REQUEST_REASON: &str = "Request timed out.";

// ============================================================================
// Types
// ============================================================================

/// Callback invoked on every state transition with `(from, to)`.
pub type StateListener = Box<dyn Fn(ConnectionState, ConnectionState) + Send + Sync>;

// ============================================================================
// SessionInput
// ============================================================================

/// Asynchronous input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// Event from the transport.
    Transport(TransportEvent),
    /// Timer expiry.
    Timer(TimerInput),
}

impl From<TransportEvent> for SessionInput {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<TimerInput> for SessionInput {
    fn from(input: TimerInput) -> Self {
        Self::Timer(input)
    }
}

// ============================================================================
// SessionMachine
// ============================================================================

/// Connection lifecycle, authentication and liveness for one session.
pub struct SessionMachine<T: Transport, M: Timers> {
    config: SessionConfig,
    transport: T,
    timers: M,
    store: Arc<dyn CredentialStore>,
    token: Option<String>,
    state: ConnectionState,
    /// Generation of the current (or last) connection attempt.
    connection: ConnectionId,
    correlator: RequestCorrelator,
    liveness: LivenessMonitor,
    dispatcher: EventDispatcher,
    heartbeat: Option<M::Handle>,
    state_listeners: Vec<StateListener>,
    shut_down: bool,
}

// ============================================================================
// SessionMachine - Constructor & Accessors
// ============================================================================

impl<T: Transport, M: Timers> SessionMachine<T, M> {
    /// Creates a closed session, loading any cached token from `store`.
    pub fn new(
        config: SessionConfig,
        transport: T,
        timers: M,
        store: Arc<dyn CredentialStore>,
        now: Instant,
    ) -> Self {
        let token = store.load();
        debug!(cached_token = token.is_some(), "Session created");

        Self {
            correlator: RequestCorrelator::new(config.request_timeout),
            liveness: LivenessMonitor::new(config.freshness, config.max_missed_heartbeats, now),
            config,
            transport,
            timers,
            store,
            token,
            state: ConnectionState::Closed,
            connection: ConnectionId::default(),
            dispatcher: EventDispatcher::new(),
            heartbeat: None,
            state_listeners: Vec::new(),
            shut_down: false,
        }
    }

    /// Replaces the dispatcher, keeping subscriptions made before start.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the cached credential token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the current connection generation.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Returns the number of consecutive unanswered heartbeats.
    #[inline]
    #[must_use]
    pub fn missed_heartbeats(&self) -> u32 {
        self.liveness.missed()
    }

    /// Returns `true` while a request awaits an answer.
    #[inline]
    #[must_use]
    pub fn has_pending_request(&self) -> bool {
        self.correlator.is_pending()
    }

    /// Returns the transport.
    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the timers.
    #[inline]
    pub fn timers(&self) -> &M {
        &self.timers
    }

    /// Registers a handler for a server action.
    pub fn subscribe(&mut self, action: ServerAction, handler: EventHandler) {
        self.dispatcher.subscribe(action, handler);
    }

    /// Registers a state transition listener.
    pub fn on_state_change(&mut self, listener: StateListener) {
        self.state_listeners.push(listener);
    }
}

// ============================================================================
// SessionMachine - Operations
// ============================================================================

impl<T: Transport, M: Timers> SessionMachine<T, M> {
    /// Starts a new connection attempt.
    ///
    /// No-op unless the session is `Closed` and not shut down.
    pub fn open(&mut self) {
        if self.shut_down {
            debug!("Open ignored, session shut down");
            return;
        }
        if self.state != ConnectionState::Closed {
            debug!(state = %self.state, "Open ignored, connection already in progress");
            return;
        }

        self.connection = self.connection.next();
        self.correlator.reset();
        self.transition(ConnectionState::Opening);
        self.transport.open(self.connection);
    }

    /// Authenticates the connection with the cached token.
    ///
    /// Silent no-op while already authenticating or authenticated, and
    /// deferred to the next open when the transport is not open.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredential`] if no token is set
    /// - [`Error::StuckRequest`] if the previous request never got an
    ///   answer; the connection is reset and login retried on reopen
    pub fn login(&mut self, now: Instant) -> Result<()> {
        let Some(token) = self.token.clone() else {
            return Err(Error::MissingCredential);
        };

        match self.state {
            ConnectionState::Authenticating | ConnectionState::Authenticated => {
                trace!(state = %self.state, "Login ignored, already logged in or pending");
                return Ok(());
            }
            ConnectionState::Closed | ConnectionState::Opening => {
                debug!(state = %self.state, "Login deferred until the socket opens");
                return Ok(());
            }
            ConnectionState::Open => {}
        }

        self.send_request(ClientAction::Login, Some(Value::String(token)), now)?;
        Ok(())
    }

    /// Sets the token and logs in with it.
    ///
    /// # Errors
    ///
    /// See [`login`](Self::login).
    pub fn login_with(&mut self, token: impl Into<String>, now: Instant) -> Result<()> {
        self.set_token(Some(token.into()));
        self.login(now)
    }

    /// Replaces the cached token and persists it.
    ///
    /// A different token invalidates a login in flight or confirmed, which
    /// drops the state back to `Open`.
    pub fn set_token(&mut self, token: Option<String>) {
        if token != self.token {
            if self.state.is_logged_in_or_pending() {
                self.transition(ConnectionState::Open);
            }
            self.token = token;
        }
        self.persist_token();
    }

    /// Logs out on behalf of the user.
    ///
    /// Clears the token, tells the server, publishes `LOGOUT` and tears the
    /// connection down. The session reopens without logging in.
    pub fn logout(&mut self, now: Instant) {
        info!("Logging out");
        // Straight to Closed, without passing through Open
        self.token = None;
        self.persist_token();

        if self.state.is_live() {
            let id = self.correlator.next_id();
            self.write(OutboundEnvelope::new(id, ClientAction::Logout, None));
        }

        let payload = json!({ "reason": LOGOUT_REASON });
        self.dispatcher.notify(ServerAction::Logout, Some(&payload));
        self.teardown(LOGOUT_REASON, now);
    }

    /// Closes the session for good. No reconnect follows.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.stop_heartbeat();
        self.transport.close();
        if self.state != ConnectionState::Closed {
            self.transition(ConnectionState::Closed);
        }
        info!("Session shut down");
    }

    /// Processes one asynchronous input.
    pub fn handle(&mut self, input: SessionInput, now: Instant) {
        match input {
            SessionInput::Transport(event) => self.on_transport_event(event, now),
            SessionInput::Timer(TimerInput::HeartbeatTick { connection }) => {
                if connection == self.connection {
                    self.on_heartbeat_tick(now);
                } else {
                    trace!(%connection, "Stale heartbeat tick ignored");
                }
            }
            SessionInput::Timer(TimerInput::ReconnectDue) => {
                debug!("Reconnecting");
                self.open();
            }
        }
    }
}

// ============================================================================
// SessionMachine - Input Handling
// ============================================================================

impl<T: Transport, M: Timers> SessionMachine<T, M> {
    /// Routes a transport event of the current connection.
    fn on_transport_event(&mut self, event: TransportEvent, now: Instant) {
        if event.connection != self.connection {
            trace!(connection = %event.connection, "Event from superseded connection ignored");
            return;
        }

        match event.kind {
            TransportEventKind::Opened => self.on_opened(now),
            TransportEventKind::Message(frame) => self.on_frame(&frame, now),
            TransportEventKind::Closed { reason } => {
                let e = Error::transport_closed(reason.as_str());
                debug!(error = %e, "Transport reported close");
                self.teardown(&reason, now);
            }
        }
    }

    /// Transport reported the socket open.
    fn on_opened(&mut self, now: Instant) {
        if self.state != ConnectionState::Opening {
            debug!(state = %self.state, "Open event ignored");
            return;
        }

        self.transition(ConnectionState::Open);
        info!(connection = %self.connection, "Socket open");

        self.liveness.reset(now);
        self.stop_heartbeat();
        self.heartbeat = Some(
            self.timers
                .start_heartbeat(self.config.heartbeat_period, self.connection),
        );

        self.dispatcher.notify(ServerAction::Open, None);

        if self.token.is_some()
            && let Err(e) = self.login(now)
        {
            warn!(error = %e, "Automatic login failed");
        }
    }

    /// Decodes and reacts to one inbound frame.
    fn on_frame(&mut self, frame: &str, now: Instant) {
        let envelope = match InboundEnvelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, %frame, "Server response was malformed, dropping frame");
                // The server did answer, even if badly
                self.correlator.complete_request();
                return;
            }
        };

        self.liveness.observe_inbound(now);
        if !envelope.action.is_heartbeat() {
            self.correlator.complete_request();
        }

        debug!(action = %envelope.action, "Inbound envelope");
        self.dispatch(envelope, now);
    }

    /// Built-in reactions, then external subscribers.
    fn dispatch(&mut self, envelope: InboundEnvelope, now: Instant) {
        let InboundEnvelope { action, data, .. } = envelope;

        match action {
            ServerAction::Ping => {
                if self.teardown_if_stuck(now) {
                    return;
                }
                let id = self.correlator.next_id();
                self.write(OutboundEnvelope::new(id, ClientAction::Pong, data.clone()));
                self.dispatcher.notify(action, data.as_ref());
            }

            ServerAction::Pong => {
                if !self.liveness.pong_received(data.as_ref()) {
                    warn!(payload = ?data, "Invalid PONG response");
                }
                self.dispatcher.notify(action, data.as_ref());
            }

            ServerAction::LoggedIn => {
                if self.state == ConnectionState::Authenticating {
                    self.transition(ConnectionState::Authenticated);
                    info!("Successfully logged in to socket");
                    self.dispatcher.notify(action, data.as_ref());
                } else {
                    warn!(state = %self.state, "Unexpected LOGGED_IN ignored");
                }
            }

            ServerAction::Logout => {
                let reason = data
                    .as_ref()
                    .and_then(|d| d.get("reason"))
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given");
                info!(%reason, "Logged out by server");

                self.set_token(None);
                self.dispatcher.notify(action, data.as_ref());
            }

            ServerAction::NewMessage => {
                self.dispatcher.publish(action, data.as_ref());
            }

            ServerAction::Open | ServerAction::Close => {
                warn!(%action, "Synthetic action received over the wire, ignored");
            }
        }
    }

    /// Periodic liveness check.
    fn on_heartbeat_tick(&mut self, now: Instant) {
        if !self.state.is_live() {
            trace!(state = %self.state, "Heartbeat tick ignored");
            return;
        }

        if self.teardown_if_stuck(now) {
            return;
        }

        match self.liveness.check(now) {
            LivenessVerdict::Fresh => trace!("Connection fresh"),
            LivenessVerdict::Probe { missed } => {
                debug!(missed, "Connection stale, sending heartbeat");
                let id = self.correlator.next_id();
                self.write(OutboundEnvelope::new(
                    id,
                    ClientAction::Ping,
                    Some(LivenessMonitor::probe_payload()),
                ));
            }
            LivenessVerdict::Dead { missed } => {
                let e = Error::dead_connection(missed);
                warn!(error = %e, "Socket connection timed out");
                self.teardown(TIMED_OUT_REASON, now);
            }
        }
    }
}

// ============================================================================
// SessionMachine - Internals
// ============================================================================

impl<T: Transport, M: Timers> SessionMachine<T, M> {
    /// Sends a request that expects an answer.
    fn send_request(&mut self, action: ClientAction, data: Option<Value>, now: Instant) -> Result<()> {
        let id = match self.correlator.begin_request(now) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Request timed out");
                self.teardown(STUCK_REQUEST_REASON, now);
                return Err(e);
            }
        };

        if action == ClientAction::Login {
            self.transition(ConnectionState::Authenticating);
        }
        self.write(OutboundEnvelope::new(id, action, data));
        Ok(())
    }

    /// Resets the connection if the outstanding request is past its timeout.
    ///
    /// Returns `true` if the connection was torn down.
    fn teardown_if_stuck(&mut self, now: Instant) -> bool {
        match self.correlator.check_stuck(now) {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "Request timed out");
                self.teardown(STUCK_REQUEST_REASON, now);
                true
            }
        }
    }

    /// Writes the token through to the credential store.
    fn persist_token(&mut self) {
        if let Err(e) = self.store.store(self.token.as_deref()) {
            warn!(error = %e, "Failed to persist credential token");
        }
    }

    /// Encodes and writes an envelope if the socket is open.
    fn write(&mut self, envelope: OutboundEnvelope) {
        if !self.state.is_live() {
            trace!(action = %envelope.action(), state = %self.state, "Send dropped, socket not open");
            return;
        }

        match envelope.encode() {
            Ok(frame) => {
                trace!(id = %envelope.id, action = %envelope.action(), "Envelope sent");
                self.transport.send(frame);
            }
            Err(e) => error!(error = %e, "Failed to encode envelope"),
        }
    }

    /// The single path that ends a connection attempt.
    fn teardown(&mut self, reason: &str, now: Instant) {
        if self.state == ConnectionState::Closed {
            trace!(%reason, "Teardown ignored, already closed");
            return;
        }

        self.stop_heartbeat();
        self.transport.close();
        self.liveness.reset(now);
        self.correlator.complete_request();
        self.transition(ConnectionState::Closed);
        info!(%reason, "Socket closed");

        let payload = json!({ "reason": reason });
        self.dispatcher.notify(ServerAction::Close, Some(&payload));

        if !self.shut_down {
            // Constant delay, no backoff
            self.timers.schedule_reconnect(self.config.reconnect_delay);
        }
    }

    /// Cancels the heartbeat timer, if running.
    fn stop_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.take() {
            self.timers.cancel(handle);
        }
    }

    /// Moves to `next` and informs listeners.
    fn transition(&mut self, next: ConnectionState) {
        let prev = self.state;
        if prev == next {
            return;
        }

        debug_assert!(
            prev.can_transition_to(next),
            "illegal transition {prev} -> {next}"
        );
        self.state = next;
        debug!(from = %prev, to = %next, "State transition");

        for listener in &self.state_listeners {
            listener(prev, next);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
