//! Socket protocol message types.
//!
//! This module defines the message format exchanged between the client and
//! the server over the session socket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `OutboundEnvelope` | Client → Server | Request stamped with an id |
//! | `InboundEnvelope` | Server → Client | Push event or reply |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Client and server action vocabularies |
//! | `envelope` | Envelope types and the text codec |

// ============================================================================
// Submodules
// ============================================================================

/// Action vocabularies.
pub mod action;

/// Envelope types and codec.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{ClientAction, ServerAction};
pub use envelope::{ClientMessage, InboundEnvelope, OutboundEnvelope};

// ============================================================================
// Constants
// ============================================================================

/// Payload carried by client heartbeat probes and echoed back by the server.
pub const HEARTBEAT_SENTINEL: u64 = 0xDEAD_BEEF;
