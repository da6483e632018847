//! Per-connection lifecycle state machine.
//!
//! A connection moves through exactly three states:
//!
//! ```text
//! ┌──────────────────────┐  identity frame   ┌────────┐
//! │ PendingRegistration  │──────────────────>│ Active │
//! └──────────────────────┘                   └────────┘
//!            │                                    │
//!            │ closure / error                    │ closure / error
//!            ↓                                    ↓
//!        ┌────────┐                          ┌────────┐
//!        │ Closed │                          │ Closed │
//!        └────────┘                          └────────┘
//! ```
//!
//! Only `Active` connections appear in the peer registry. A connection
//! that dies before its identity frame completes is discarded without
//! ever touching the registry.

use crate::error::ConnectionError;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, awaiting the identity frame
    PendingRegistration,
    /// Registered and eligible for broadcast
    Active,
    /// Terminal; removed from all structures
    Closed,
}

/// State machine for one connection's lifecycle.
///
/// Pure state, no I/O. The identity itself lives in the registry's
/// [`crate::Peer`] entry; this type only tracks where in the lifecycle
/// the connection is.
#[derive(Debug, Clone)]
pub struct Connection {
    state: ConnectionState,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create a connection in [`ConnectionState::PendingRegistration`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: ConnectionState::PendingRegistration }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection is registered and broadcast-eligible.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    /// Complete registration: `PendingRegistration` -> `Active`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if the connection is not
    ///   pending registration
    pub fn register(&mut self) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::PendingRegistration {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "register",
            });
        }

        self.state = ConnectionState::Active;
        Ok(())
    }

    /// Transition to `Closed`. Valid from any state; idempotent.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connection_is_pending() {
        let conn = Connection::new();
        assert_eq!(conn.state(), ConnectionState::PendingRegistration);
        assert!(!conn.is_active());
    }

    #[test]
    fn register_activates() {
        let mut conn = Connection::new();
        conn.register().unwrap();
        assert!(conn.is_active());
    }

    #[test]
    fn register_twice_fails() {
        let mut conn = Connection::new();
        conn.register().unwrap();

        let err = conn.register().unwrap_err();
        assert_eq!(
            err,
            ConnectionError::InvalidState { state: ConnectionState::Active, operation: "register" }
        );
    }

    #[test]
    fn close_from_any_state() {
        let mut pending = Connection::new();
        pending.close();
        assert_eq!(pending.state(), ConnectionState::Closed);

        let mut active = Connection::new();
        active.register().unwrap();
        active.close();
        active.close(); // idempotent
        assert_eq!(active.state(), ConnectionState::Closed);
    }

    #[test]
    fn register_after_close_fails() {
        let mut conn = Connection::new();
        conn.close();
        assert!(conn.register().is_err());
    }
}
