//! Publish/subscribe registry for server actions.
//!
//! Handlers are keyed by the closed [`ServerAction`] enum and run
//! synchronously, in registration order, on the session task. Registration
//! is permanent for the lifetime of the session.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{trace, warn};

use crate::protocol::ServerAction;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Receives the action payload, if any.
pub type EventHandler = Box<dyn Fn(Option<&Value>) + Send + Sync>;

// ============================================================================
// EventDispatcher
// ============================================================================

/// Routes server actions to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: FxHashMap<ServerAction, Vec<EventHandler>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `action`.
    pub fn subscribe(&mut self, action: ServerAction, handler: EventHandler) {
        self.handlers.entry(action).or_default().push(handler);
    }

    /// Invokes every handler for `action`.
    ///
    /// Returns the number of handlers invoked. Zero handlers is logged as
    /// an unhandled action but is not an error.
    pub fn publish(&self, action: ServerAction, payload: Option<&Value>) -> usize {
        let delivered = self.notify(action, payload);
        if delivered == 0 {
            warn!(%action, "Unhandled socket action");
        }
        delivered
    }

    /// Like [`publish`](Self::publish) but silent when nobody listens.
    ///
    /// Used for actions the session already reacted to itself.
    pub fn notify(&self, action: ServerAction, payload: Option<&Value>) -> usize {
        let Some(handlers) = self.handlers.get(&action) else {
            return 0;
        };

        trace!(%action, handlers = handlers.len(), "Dispatching");
        for handler in handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Returns the number of handlers registered for `action`.
    #[inline]
    #[must_use]
    pub fn handler_count(&self, action: ServerAction) -> usize {
        self.handlers.get(&action).map_or(0, Vec::len)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(
                ServerAction::NewMessage,
                Box::new(move |_| seen.lock().push(tag)),
            );
        }

        assert_eq!(dispatcher.publish(ServerAction::NewMessage, None), 3);
        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_payload_is_passed_through() {
        let seen = Arc::new(Mutex::new(None));
        let mut dispatcher = EventDispatcher::new();
        let sink = Arc::clone(&seen);
        dispatcher.subscribe(
            ServerAction::Logout,
            Box::new(move |payload| *sink.lock() = payload.cloned()),
        );

        let payload = json!({"reason": "expired"});
        dispatcher.publish(ServerAction::Logout, Some(&payload));
        assert_eq!(*seen.lock(), Some(payload));
    }

    #[test]
    fn test_unhandled_action_is_not_an_error() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.publish(ServerAction::NewMessage, None), 0);
        assert_eq!(dispatcher.handler_count(ServerAction::NewMessage), 0);
    }

    #[test]
    fn test_handlers_are_per_action() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(ServerAction::LoggedIn, Box::new(|_| {}));

        assert_eq!(dispatcher.handler_count(ServerAction::LoggedIn), 1);
        assert_eq!(dispatcher.notify(ServerAction::Logout, None), 0);
    }
}
