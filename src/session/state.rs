//! Connection lifecycle states.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the single session connection.
///
/// ```text
/// Closed ──open──► Opening ──opened──► Open ──login──► Authenticating ──LOGGED_IN──► Authenticated
///    ▲                │                 │  ▲                 │                          │
///    └────teardown────┴─────────────────┘  └──token cleared──┴──────────────────────────┘
/// ```
///
/// Every state except `Closed` can be torn down to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Closed,
    /// Transport connecting.
    Opening,
    /// Transport open, not authenticated.
    Open,
    /// `LOGIN` sent, waiting for `LOGGED_IN`.
    Authenticating,
    /// Server accepted the credential token.
    Authenticated,
}

impl ConnectionState {
    /// Returns `true` while the transport is open and writable.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Open | Self::Authenticating | Self::Authenticated)
    }

    /// Returns `true` once the server confirmed the login.
    #[inline]
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Returns `true` while a login is in flight or confirmed.
    #[inline]
    #[must_use]
    pub const fn is_logged_in_or_pending(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Authenticated)
    }

    /// Returns `true` if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use ConnectionState::*;

        matches!(
            (*self, next),
            (Closed, Opening)
                | (Opening, Open)
                | (Open, Authenticating)
                | (Authenticating, Authenticated)
                | (Authenticating, Open)
                | (Authenticated, Open)
                | (Opening | Open | Authenticating | Authenticated, Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use ConnectionState::*;

    #[test]
    fn test_no_shortcut_to_authenticated() {
        for from in [Closed, Opening, Open, Authenticated] {
            assert!(!from.can_transition_to(Authenticated), "{from} -> authenticated");
        }
        assert!(Authenticating.can_transition_to(Authenticated));
    }

    #[test]
    fn test_closed_only_reopens() {
        assert!(Closed.can_transition_to(Opening));
        for next in [Closed, Open, Authenticating, Authenticated] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_liveness_states() {
        assert!(!Closed.is_live());
        assert!(!Opening.is_live());
        assert!(Open.is_live());
        assert!(Authenticating.is_live());
        assert!(Authenticated.is_live());
    }
}
