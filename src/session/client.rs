//! Tokio driver for the session state machine.
//!
//! [`SessionClient`] spawns one task that owns the [`SessionMachine`] and
//! feeds it, one input at a time, from three channels: API commands,
//! transport events and timer expiries. The handle is cheap to clone and
//! every clone talks to the same session.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use twidder_session::{
//!     MemoryCredentialStore, ServerAction, SessionClient, SessionConfig,
//! };
//!
//! # async fn example() -> twidder_session::Result<()> {
//! let config = SessionConfig::new("localhost:5000", false)?;
//! let client = SessionClient::start(config, Arc::new(MemoryCredentialStore::new()))?;
//!
//! client.subscribe(
//!     ServerAction::NewMessage,
//!     Box::new(|payload| println!("new message: {payload:?}")),
//! )?;
//! client.login_with("token").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::protocol::ServerAction;
use crate::transport::{TransportEvent, WsTransport};

use super::dispatcher::{EventDispatcher, EventHandler};
use super::machine::SessionMachine;
use super::state::ConnectionState;
use super::timers::{TimerInput, TokioTimers};

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the event loop.
enum SessionCommand {
    /// Register an action handler.
    Subscribe {
        action: ServerAction,
        handler: EventHandler,
    },
    /// Log in, optionally replacing the token first.
    Login {
        token: Option<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Replace the cached token.
    SetToken(Option<String>),
    /// User-initiated logout.
    Logout,
    /// Read the cached token.
    Token(oneshot::Sender<Option<String>>),
    /// Stop the session for good.
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// SessionClient
// ============================================================================

/// Handle to a running session.
///
/// The session keeps reconnecting until [`shutdown`](Self::shutdown) is
/// called or every handle is dropped.
#[derive(Clone)]
pub struct SessionClient {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    /// Latest connection state.
    state_rx: watch::Receiver<ConnectionState>,
}

impl SessionClient {
    /// Starts a session and opens the first connection.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the socket URL cannot be built.
    pub fn start(config: SessionConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::start_with_dispatcher(config, store, EventDispatcher::new())
    }

    /// Starts a session with handlers registered up front.
    ///
    /// Handlers in `dispatcher` see the very first `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the socket URL cannot be built.
    pub fn start_with_dispatcher(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        dispatcher: EventDispatcher,
    ) -> Result<Self> {
        let url = config.socket_url()?;
        info!(%url, "Starting session");

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);

        let mut machine = SessionMachine::new(
            config,
            WsTransport::new(url, transport_tx),
            TokioTimers::new(timer_tx),
            store,
            Instant::now(),
        )
        .with_dispatcher(dispatcher);

        machine.on_state_change(Box::new(move |_, to| {
            state_tx.send_replace(to);
        }));
        machine.open();

        tokio::spawn(Self::run_event_loop(machine, command_rx, transport_rx, timer_rx));

        Ok(Self {
            command_tx,
            state_rx,
        })
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Returns `true` once the server accepted the token.
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Registers a handler for a server action.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn subscribe(&self, action: ServerAction, handler: EventHandler) -> Result<()> {
        self.command(SessionCommand::Subscribe { action, handler })
    }

    /// Logs in with the cached token.
    ///
    /// Resolves once `LOGIN` is written or deferred, not when the server
    /// answers. Watch for [`ConnectionState::Authenticated`] for that.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredential`] if no token is cached
    /// - [`Error::StuckRequest`] if the connection had to be reset
    /// - [`Error::SessionClosed`] if the session has stopped
    pub async fn login(&self) -> Result<()> {
        self.request_login(None).await
    }

    /// Replaces the token and logs in with it.
    ///
    /// # Errors
    ///
    /// See [`login`](Self::login).
    pub async fn login_with(&self, token: impl Into<String>) -> Result<()> {
        self.request_login(Some(token.into())).await
    }

    /// Replaces the cached token without logging in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn set_token(&self, token: Option<String>) -> Result<()> {
        self.command(SessionCommand::SetToken(token))
    }

    /// Logs out, clears the token and reconnects anonymously.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn logout(&self) -> Result<()> {
        self.command(SessionCommand::Logout)
    }

    /// Returns the cached token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub async fn token(&self) -> Result<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Token(reply))?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Returns once the event loop has stopped. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command(SessionCommand::Shutdown(reply)).is_ok() {
            let _ = rx.await;
        }
    }

    async fn request_login(&self, token: Option<String>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Login { token, reply })?;
        rx.await.map_err(|_| Error::SessionClosed)?
    }

    fn command(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::SessionClosed)
    }
}

// ============================================================================
// SessionClient - Event Loop
// ============================================================================

impl SessionClient {
    /// Feeds the machine until shutdown or until every handle is gone.
    async fn run_event_loop(
        mut machine: SessionMachine<WsTransport, TokioTimers>,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        mut timer_rx: mpsc::UnboundedReceiver<TimerInput>,
    ) {
        let mut shutdown_reply = None;

        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Subscribe { action, handler }) => {
                            machine.subscribe(action, handler);
                        }

                        Some(SessionCommand::Login { token, reply }) => {
                            let now = Instant::now();
                            let result = match token {
                                Some(token) => machine.login_with(token, now),
                                None => machine.login(now),
                            };
                            let _ = reply.send(result);
                        }

                        Some(SessionCommand::SetToken(token)) => machine.set_token(token),

                        Some(SessionCommand::Logout) => machine.logout(Instant::now()),

                        Some(SessionCommand::Token(reply)) => {
                            let _ = reply.send(machine.token().map(str::to_string));
                        }

                        Some(SessionCommand::Shutdown(reply)) => {
                            debug!("Shutdown command received");
                            machine.shutdown();
                            shutdown_reply = Some(reply);
                            break;
                        }

                        None => {
                            debug!("All session handles dropped");
                            machine.shutdown();
                            break;
                        }
                    }
                }

                Some(event) = transport_rx.recv() => {
                    machine.handle(event.into(), Instant::now());
                }

                Some(input) = timer_rx.recv() => {
                    machine.handle(input.into(), Instant::now());
                }
            }
        }

        // Handles must observe a closed session once shutdown returns
        drop(command_rx);
        drop(machine);

        debug!("Session event loop terminated");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::credentials::MemoryCredentialStore;

    fn unreachable_config() -> SessionConfig {
        // Port 9 (discard) is closed on loopback in test environments
        SessionConfig::new("127.0.0.1:9", false).expect("config")
    }

    #[tokio::test]
    async fn test_token_round_trip_through_handle() {
        let store = Arc::new(MemoryCredentialStore::new());
        let client = SessionClient::start(unreachable_config(), store.clone()).expect("start");

        client.set_token(Some("tok123".to_string())).expect("set token");
        assert_eq!(client.token().await.expect("token"), Some("tok123".to_string()));
        assert_eq!(store.load(), Some("tok123".to_string()));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let client = SessionClient::start(
            unreachable_config(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .expect("start");

        let err = client.login().await.expect_err("no token");
        assert!(matches!(err, Error::MissingCredential));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_reports_closed() {
        let client = SessionClient::start(
            unreachable_config(),
            Arc::new(MemoryCredentialStore::new()),
        )
        .expect("start");

        client.shutdown().await;
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(matches!(client.token().await, Err(Error::SessionClosed)));
        assert!(matches!(client.logout(), Err(Error::SessionClosed)));

        // Second shutdown is a no-op
        client.shutdown().await;
    }
}
