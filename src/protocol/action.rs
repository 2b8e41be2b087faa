//! Action vocabulary.
//!
//! Actions are closed enums so that every handler table over them is
//! checked for exhaustiveness at compile time.
//!
//! | Direction | Actions |
//! |-----------|---------|
//! | Client → Server | `PING`, `PONG`, `LOGIN`, `LOGOUT` |
//! | Server → Client | `OPEN`, `CLOSE`, `PING`, `PONG`, `LOGOUT`, `LOGGED_IN`, `NEW_MESSAGE` |
//!
//! `OPEN` and `CLOSE` are synthetic: the session raises them locally for
//! transport lifecycle events, they never travel over the wire.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ClientAction
// ============================================================================

/// Action sent from the client to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    /// Heartbeat probe.
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Authenticate the connection with a credential token.
    Login,
    /// End the authenticated session.
    Logout,
}

impl ClientAction {
    /// All client actions.
    pub const ALL: [Self; 4] = [Self::Ping, Self::Pong, Self::Login, Self::Logout];

    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
        }
    }

    /// Returns `true` for heartbeat traffic (`PING` / `PONG`).
    #[inline]
    #[must_use]
    pub const fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Ping | Self::Pong)
    }
}

impl fmt::Display for ClientAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ServerAction
// ============================================================================

/// Action received from the server, or raised locally for transport events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerAction {
    /// Transport opened (synthetic).
    Open,
    /// Transport closed (synthetic).
    Close,
    /// Server heartbeat probe.
    Ping,
    /// Server heartbeat reply.
    Pong,
    /// Server ended the authenticated session.
    Logout,
    /// Server accepted the credential token.
    LoggedIn,
    /// A new message was posted to the user's wall.
    NewMessage,
}

impl ServerAction {
    /// All server actions.
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::Close,
        Self::Ping,
        Self::Pong,
        Self::Logout,
        Self::LoggedIn,
        Self::NewMessage,
    ];

    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Logout => "LOGOUT",
            Self::LoggedIn => "LOGGED_IN",
            Self::NewMessage => "NEW_MESSAGE",
        }
    }

    /// Returns `true` for heartbeat traffic (`PING` / `PONG`).
    #[inline]
    #[must_use]
    pub const fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Ping | Self::Pong)
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
