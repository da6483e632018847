//! Sans-IO relay logic for relaychat.
//!
//! This crate holds everything about the relay that is not I/O: who is
//! joined ([`PeerRegistry`]), what state each connection is in
//! ([`Connection`]), how a byte stream becomes discrete frames
//! ([`FrameReader`]), and how one peer's message fans out to the others
//! ([`route`]). The [`RelayDriver`] ties them together behind a single
//! entry point: events in, actions out.
//!
//! # Architecture
//!
//! The driver follows the action pattern: the runtime feeds it
//! [`RelayEvent`]s (connection accepted, frame received, connection
//! closed) and executes the [`RelayAction`]s it returns (send bytes,
//! close connection, log). No sockets, clocks, or threads live here, so
//! every relay behavior is testable with plain function calls.
//!
//! All driver state is mutated inside `process_event`; a runtime that
//! serializes those calls (one task, or one mutex) preserves the
//! relay's single-logical-thread bookkeeping invariants by
//! construction.

mod broadcast;
mod connection;
mod driver;
mod error;
mod reader;
mod registry;

pub use broadcast::route;
pub use connection::{Connection, ConnectionState};
pub use driver::{LogLevel, RelayAction, RelayConfig, RelayDriver, RelayEvent};
pub use error::{ConnectionError, RegistryError, RelayError};
pub use reader::{FrameReader, ReadProgress};
pub use registry::{Peer, PeerRegistry};
