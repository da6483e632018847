//! Relaychat client library.
//!
//! [`transport::connect`] opens a connection, registers a display name,
//! and returns a [`transport::ConnectedClient`] handle: text out,
//! [`event::ClientEvent`]s in. The I/O lives in spawned tasks; the
//! handle is plain async Rust with no socket types in its signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod event;
pub mod transport;

pub use event::ClientEvent;
pub use transport::{ConnectedClient, TransportError, connect};
