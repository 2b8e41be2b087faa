//! WebSocket transport layer.
//!
//! This module owns the raw socket between the client and the server. It
//! knows nothing about envelopes or sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  SessionMachine │                              │  Server         │
//! │                 │         WebSocket            │                 │
//! │  WsTransport    │◄────────────────────────────►│  /socket        │
//! │  → socket task  │     <ws|wss>://host/socket   │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` - Spawn a socket task for a new [`ConnectionId`]
//! 2. `TransportEventKind::Opened` - Socket connected
//! 3. `TransportEventKind::Message` - Text frames from the server
//! 4. `TransportEventKind::Closed` - Exactly once per connection attempt
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | Transport trait and the tokio-tungstenite adapter |
//! | `url` | Endpoint derivation from host and page security |
//!
//! [`ConnectionId`]: crate::identifiers::ConnectionId

// ============================================================================
// Submodules
// ============================================================================

/// Transport trait and WebSocket adapter.
pub mod socket;

/// Socket endpoint derivation.
pub mod url;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::{Transport, TransportEvent, TransportEventKind, WsTransport};
pub use self::url::{SOCKET_PATH, page_origin, socket_url};
