//! Error types for the relay core.
//!
//! Registry errors indicate bookkeeping misuse by the driver - a bug,
//! not a peer behavior. The driver contains them as fatal for the
//! affected connection; they never escape `process_event` as process
//! failures.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from [`crate::PeerRegistry`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No peer is registered under this connection id.
    #[error("no peer registered for connection {0}")]
    NotFound(u64),

    /// A peer is already registered under this connection id.
    ///
    /// Connection ids are allocated from a monotonic counter and never
    /// reused, so hitting this means the multiplexer's bookkeeping has
    /// drifted.
    #[error("connection {0} is already registered")]
    AlreadyRegistered(u64),
}

/// Errors from [`crate::Connection`] state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Errors surfaced by [`crate::RelayDriver::process_event`].
///
/// Per-connection anomalies (framing violations, registry misuse) are
/// converted into close actions instead of errors; what remains here is
/// runtime/driver disagreement about which connections exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// A frame arrived for a connection the driver is not tracking.
    #[error("unknown connection: {0}")]
    UnknownConnection(u64),
}
