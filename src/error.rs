//! Error types for the session client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use twidder_session::{Result, SessionClient};
//!
//! async fn example(client: &SessionClient) -> Result<()> {
//!     client.login_with("tok123").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Storage`] |
//! | Connection | [`Error::Connection`], [`Error::TransportClosed`], [`Error::DeadConnection`], [`Error::SessionClosed`] |
//! | Protocol | [`Error::MalformedEnvelope`], [`Error::StuckRequest`] |
//! | Authentication | [`Error::MissingCredential`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! None of these are fatal to the process. Connection-class failures are
//! always followed by a scheduled reconnect inside the session.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the session configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Credential store read or write failed.
    #[error("Credential storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The underlying transport closed.
    ///
    /// Always routed through the session teardown path and followed by a
    /// reconnect attempt.
    #[error("Transport closed: {reason}")]
    TransportClosed {
        /// Close reason reported by the transport.
        reason: String,
    },

    /// Too many consecutive heartbeats went unanswered.
    #[error("Connection dead after {missed} missed heartbeats")]
    DeadConnection {
        /// Number of unanswered heartbeat probes.
        missed: u32,
    },

    /// The session task has exited; the handle can no longer be used.
    #[error("Session closed")]
    SessionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be decoded into an envelope.
    ///
    /// Recovered locally: the frame is dropped and the connection kept.
    #[error("Malformed envelope: {message}")]
    MalformedEnvelope {
        /// Why the frame was rejected.
        message: String,
    },

    /// A request stayed unanswered past the request timeout.
    ///
    /// The session resets the connection instead of retrying in place.
    #[error("Request {request_id} stuck for {elapsed_ms}ms")]
    StuckRequest {
        /// Last request id issued before the stuck request was detected.
        request_id: RequestId,
        /// Milliseconds since the outstanding request was sent.
        elapsed_ms: u64,
    },

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Login attempted without a credential token.
    #[error("No credential token set")]
    MissingCredential,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a transport closed error.
    #[inline]
    pub fn transport_closed(reason: impl Into<String>) -> Self {
        Self::TransportClosed {
            reason: reason.into(),
        }
    }

    /// Creates a dead connection error.
    #[inline]
    pub fn dead_connection(missed: u32) -> Self {
        Self::DeadConnection { missed }
    }

    /// Creates a malformed envelope error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            message: message.into(),
        }
    }

    /// Creates a stuck request error.
    #[inline]
    pub fn stuck_request(request_id: RequestId, elapsed_ms: u64) -> Self {
        Self::StuckRequest {
            request_id,
            elapsed_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection-level failure.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::TransportClosed { .. }
                | Self::DeadConnection { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the session recovers from this error on its own.
    ///
    /// Recoverable errors are handled by a teardown and reconnect cycle or
    /// by dropping a single frame.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedEnvelope { .. }
                | Self::StuckRequest { .. }
                | Self::DeadConnection { .. }
                | Self::TransportClosed { .. }
                | Self::Connection { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
