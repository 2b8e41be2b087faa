//! Duplex socket adapter.
//!
//! Owns the raw WebSocket and reports its lifecycle as primitive events.
//! It has no protocol knowledge and never retries; reconnecting is the
//! session's job.
//!
//! # Event Loop
//!
//! Each [`Transport::open`] spawns one tokio task for that connection which:
//!
//! - Connects to the endpoint
//! - Forwards text frames as [`TransportEventKind::Message`]
//! - Writes queued outbound frames
//! - Reports exactly one [`TransportEventKind::Closed`] when it ends

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace};
use url::Url;

use crate::error::Error;
use crate::identifiers::ConnectionId;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TransportEvent
// ============================================================================

/// A lifecycle or data event from one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Connection generation that produced the event.
    pub connection: ConnectionId,
    /// What happened.
    pub kind: TransportEventKind,
}

/// Kinds of transport events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The socket is open and writable.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The socket closed or failed to connect.
    Closed {
        /// Human-readable close reason.
        reason: String,
    },
}

impl TransportEvent {
    /// Creates an `Opened` event.
    #[inline]
    #[must_use]
    pub fn opened(connection: ConnectionId) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Opened,
        }
    }

    /// Creates a `Message` event.
    #[inline]
    #[must_use]
    pub fn message(connection: ConnectionId, frame: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Message(frame.into()),
        }
    }

    /// Creates a `Closed` event.
    #[inline]
    #[must_use]
    pub fn closed(connection: ConnectionId, reason: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Closed {
                reason: reason.into(),
            },
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Primitive duplex socket operations.
///
/// Implementations report results asynchronously as [`TransportEvent`]s
/// tagged with the `connection` passed to [`open`](Transport::open).
pub trait Transport: Send {
    /// Starts a new connection attempt, replacing any previous one.
    fn open(&mut self, connection: ConnectionId);

    /// Queues a text frame. Silently dropped if no connection is open.
    fn send(&mut self, frame: String);

    /// Closes the current connection, if any.
    fn close(&mut self);
}

// ============================================================================
// WsTransport
// ============================================================================

/// Commands for a connection task.
enum SocketCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Close,
}

/// Handle to the task serving the current connection.
struct ActiveSocket {
    connection: ConnectionId,
    command_tx: mpsc::UnboundedSender<SocketCommand>,
}

/// [`Transport`] backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
pub struct WsTransport {
    /// Endpoint URL.
    url: Url,
    /// Where connection tasks report events.
    events: mpsc::UnboundedSender<TransportEvent>,
    /// Current connection task.
    active: Option<ActiveSocket>,
}

impl WsTransport {
    /// Creates a transport for `url` reporting to `events`.
    #[must_use]
    pub fn new(url: Url, events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            url,
            events,
            active: None,
        }
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for WsTransport {
    fn open(&mut self, connection: ConnectionId) {
        self.close();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(
            self.url.clone(),
            connection,
            command_rx,
            self.events.clone(),
        ));

        debug!(%connection, url = %self.url, "Socket opening");
        self.active = Some(ActiveSocket {
            connection,
            command_tx,
        });
    }

    fn send(&mut self, frame: String) {
        match &self.active {
            Some(active) => {
                if active.command_tx.send(SocketCommand::Send(frame)).is_err() {
                    trace!(connection = %active.connection, "Send dropped, socket task ended");
                }
            }
            None => trace!("Send dropped, no socket"),
        }
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.command_tx.send(SocketCommand::Close);
            debug!(connection = %active.connection, "Socket close requested");
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Connection Task
// ============================================================================

/// Serves one connection from connect to close.
async fn run_socket(
    url: Url,
    connection: ConnectionId,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            let e = Error::connection(e.to_string());
            error!(%connection, error = %e, "Socket connect failed");
            let _ = events.send(TransportEvent::closed(connection, e.to_string()));
            return;
        }
    };

    info!(%connection, url = %url, "Socket connected");
    let _ = events.send(TransportEvent::opened(connection));

    let reason = run_event_loop(ws_stream, connection, &mut command_rx, &events).await;

    debug!(%connection, %reason, "Socket task terminated");
    let _ = events.send(TransportEvent::closed(connection, reason));
}

/// Pumps frames in both directions until the socket ends.
///
/// Returns the close reason.
async fn run_event_loop(
    ws_stream: WsStream,
    connection: ConnectionId,
    command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> String {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(%connection, frame = %text.as_str(), "Frame received");
                        let _ = events.send(TransportEvent::message(connection, text.as_str()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_owned())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "no reason...".to_string());
                        return format!("closed by server ({reason})");
                    }

                    Some(Err(e)) => {
                        let e = Error::from(e);
                        error!(%connection, error = %e, "WebSocket error");
                        return e.to_string();
                    }

                    None => return "stream ended".to_string(),

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the session
            command = command_rx.recv() => {
                match command {
                    Some(SocketCommand::Send(frame)) => {
                        trace!(%connection, %frame, "Frame sent");
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            let e = Error::from(e);
                            error!(%connection, error = %e, "Send failed");
                            return e.to_string();
                        }
                    }

                    Some(SocketCommand::Close) | None => {
                        let _ = ws_write.close().await;
                        return "closed by client".to_string();
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
