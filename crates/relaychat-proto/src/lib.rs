//! Wire framing for the relaychat protocol.
//!
//! Every logical message unit on the wire is a [`Frame`]: a fixed-width
//! length header followed by a UTF-8 body. The header is
//! [`HEADER_LENGTH`] bytes of left-justified, space-padded ASCII decimal
//! text carrying the body's length in *bytes* (not characters - a
//! multi-byte code point counts once per encoded byte).
//!
//! A full chat event is two frames back to back: the sender's identity
//! frame followed by the content frame. This crate only knows about
//! single frames; pairing is a relay-level concern.
//!
//! All functions here are pure transformations with no I/O.

mod errors;
mod frame;
mod header;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::{HEADER_LENGTH, MAX_BODY_LEN, decode_header, encode_header};
