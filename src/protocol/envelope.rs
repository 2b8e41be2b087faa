//! Wire envelopes and their text codec.
//!
//! Outbound (client → server):
//!
//! ```json
//! { "id": 0, "message": { "action": "LOGIN", "data": "tok123" } }
//! ```
//!
//! Inbound (server → client):
//!
//! ```json
//! { "action": "LOGGED_IN", "clientId": 0, "data": null }
//! ```
//!
//! Payloads are passed through as opaque JSON. Only the structural fields
//! are validated.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value, to_string};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{ClientAction, ServerAction};

// ============================================================================
// OutboundEnvelope
// ============================================================================

/// A client-initiated message stamped with a request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    /// Request id, unique within the current connection.
    pub id: RequestId,

    /// Action and payload.
    pub message: ClientMessage,
}

/// The `message` member of an outbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Requested action.
    pub action: ClientAction,

    /// Optional payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OutboundEnvelope {
    /// Creates a new outbound envelope.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, action: ClientAction, data: Option<Value>) -> Self {
        Self {
            id,
            message: ClientMessage { action, data },
        }
    }

    /// Returns the action.
    #[inline]
    #[must_use]
    pub fn action(&self) -> ClientAction {
        self.message.action
    }

    /// Encodes into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Decodes a text frame produced by a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEnvelope`] if the frame is not an object
    /// with an integer `id` and a `message` carrying a known action.
    pub fn decode(frame: &str) -> Result<Self> {
        let value = parse_object(frame)?;

        if !value.get("id").is_some_and(Value::is_u64) {
            return Err(Error::malformed("missing integer id field"));
        }
        let Some(message) = value.get("message") else {
            return Err(Error::malformed("missing message field"));
        };
        check_action(message)?;

        from_value(value).map_err(|e| Error::malformed(e.to_string()))
    }
}

// ============================================================================
// InboundEnvelope
// ============================================================================

/// A server-pushed event or reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Server action.
    pub action: ServerAction,

    /// Request id this envelope answers, when it is a reply.
    #[serde(
        rename = "clientId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<u64>,

    /// Optional payload. JSON `null` decodes as `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InboundEnvelope {
    /// Creates a server push with no reply id.
    #[inline]
    #[must_use]
    pub fn new(action: ServerAction, data: Option<Value>) -> Self {
        Self {
            action,
            client_id: None,
            data,
        }
    }

    /// Encodes into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }

    /// Decodes a text frame received from the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEnvelope`] if the frame is not a JSON
    /// object or lacks a recognizable `action`.
    pub fn decode(frame: &str) -> Result<Self> {
        let value = parse_object(frame)?;
        check_action(&value)?;

        from_value(value).map_err(|e| Error::malformed(e.to_string()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a frame and checks it is a JSON object.
fn parse_object(frame: &str) -> Result<Value> {
    let value: Value =
        from_str(frame).map_err(|e| Error::malformed(format!("not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(Error::malformed("expected a JSON object"));
    }

    Ok(value)
}

/// Checks that `value` carries a string `action` member.
fn check_action(value: &Value) -> Result<()> {
    match value.get("action") {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(Error::malformed("action field is not a string")),
        None => Err(Error::malformed("missing action field")),
    }
}

// ============================================================================
// Tests
// ============================================================================
