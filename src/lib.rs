//! Twidder session - real-time session protocol client.
//!
//! This library keeps one authenticated WebSocket session open against the
//! Twidder server and turns the socket into a stream of typed server
//! actions.
//!
//! # Architecture
//!
//! The client follows a layered model:
//!
//! - **Transport**: raw `ws://` / `wss://` socket, one task per connection attempt
//! - **Protocol**: JSON envelopes with a closed action vocabulary
//! - **Session**: lifecycle, login, heartbeats, reconnect and event fan-out
//!
//! Key design principles:
//!
//! - One connection at a time, each tagged with a [`ConnectionId`] generation
//! - All state lives on a single task; inputs are handled one at a time
//! - Every teardown cause goes through the same path and schedules one reconnect
//! - The credential token survives restarts through a [`CredentialStore`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use twidder_session::{
//!     FileCredentialStore, Result, ServerAction, SessionClient, SessionConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder()
//!         .page_url("https://twidder.example.com/client.html")
//!         .build()?;
//!     let store = Arc::new(FileCredentialStore::in_config_dir("twidder")?);
//!
//!     let client = SessionClient::start(config, store)?;
//!     client.subscribe(
//!         ServerAction::NewMessage,
//!         Box::new(|payload| println!("new message: {payload:?}")),
//!     )?;
//!
//!     client.login_with("token").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Endpoint and timing configuration |
//! | [`credentials`] | Token persistence |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Request and connection ids |
//! | [`protocol`] | Actions and envelope codec |
//! | [`session`] | State machine, liveness, dispatcher and driver |
//! | [`transport`] | WebSocket adapter and URL derivation |

// ============================================================================
// Modules
// ============================================================================

/// Session configuration.
///
/// Use [`SessionConfig::builder()`] to override timing defaults.
pub mod config;

/// Credential token persistence.
pub mod credentials;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Socket protocol message types.
pub mod protocol;

/// Session layer.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{SessionConfig, SessionConfigBuilder};

// Credentials
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, RequestId};

// Protocol types
pub use protocol::{ClientAction, InboundEnvelope, OutboundEnvelope, ServerAction};

// Session types
pub use session::{ConnectionState, EventDispatcher, EventHandler, SessionClient, SessionMachine};

// Transport types
pub use transport::{Transport, TransportEvent, TransportEventKind, WsTransport};
