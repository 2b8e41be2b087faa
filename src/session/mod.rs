//! Session layer.
//!
//! Everything above the raw socket: request ids, liveness, the connection
//! state machine, event fan-out and the tokio driver that ties them
//! together.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  commands   ┌──────────────────────────────────────┐
//! │  SessionClient   │────────────►│  event loop task                     │
//! │  (cloneable)     │◄── watch ───│                                      │
//! └──────────────────┘   state     │  SessionMachine                      │
//!                                  │   ├─ RequestCorrelator               │
//!     TransportEvent ─────────────►│   ├─ LivenessMonitor                 │
//!     TimerInput ─────────────────►│   ├─ EventDispatcher                 │
//!                                  │   ├─ Transport (WsTransport)         │
//!                                  │   └─ Timers (TokioTimers)            │
//!                                  └──────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Tokio driver and public handle |
//! | `correlator` | Request ids and the pending flag |
//! | `dispatcher` | Action subscriptions |
//! | `liveness` | Heartbeat bookkeeping |
//! | `machine` | Sans-IO lifecycle and authentication |
//! | `state` | Connection states and legal transitions |
//! | `timers` | Heartbeat and reconnect timers |

// ============================================================================
// Submodules
// ============================================================================

/// Tokio driver.
pub mod client;

/// Request correlation.
pub mod correlator;

/// Event fan-out.
pub mod dispatcher;

/// Liveness monitoring.
pub mod liveness;

/// Session state machine.
pub mod machine;

/// Connection states.
pub mod state;

/// Timer facility.
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::SessionClient;
pub use correlator::RequestCorrelator;
pub use dispatcher::{EventDispatcher, EventHandler};
pub use liveness::{LivenessMonitor, LivenessVerdict};
pub use machine::{SessionInput, SessionMachine, StateListener};
pub use state::ConnectionState;
pub use timers::{TimerInput, Timers, TokioTimers};
