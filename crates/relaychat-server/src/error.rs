//! Server error types.

use std::fmt;

use relaychat_core::RelayError;

/// Errors that can occur in the server runtime.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, etc.).
    ///
    /// These are fatal errors that prevent server startup. Fix
    /// configuration and restart.
    Config(String),

    /// Transport/network error (bind failure, I/O error, etc.).
    ///
    /// At startup (bind/listen) these are fatal. After startup they are
    /// scoped to one connection: that connection is closed and the
    /// server keeps serving.
    Transport(String),

    /// Protocol error (malformed frame header, invalid body encoding).
    ///
    /// A client sent data that does not frame. Fatal for that
    /// connection only.
    Protocol(String),

    /// Relay driver error.
    ///
    /// Wraps errors from the core relay logic. See
    /// [`relaychat_core::RelayError`] for details.
    Relay(RelayError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Relay(err) => write!(f, "relay error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Relay(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RelayError> for ServerError {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
