//! Error types for frame encoding and decoding.
//!
//! Encoding failures (`BodyTooLarge`) belong to the sender and must be
//! surfaced to whoever attempted the send. Decoding failures
//! (`HeaderLength`, `InvalidHeader`, `LengthMismatch`, `InvalidBody`)
//! are framing violations by the peer; the relay treats them as fatal
//! for that connection, never for the process.

use thiserror::Error;

/// Convenience alias for fallible protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Outbound body does not fit the fixed-width header.
    ///
    /// The header has room for `HEADER_LENGTH` decimal digits; a body
    /// longer than that cannot be framed. Callers must not truncate -
    /// the send is refused instead.
    #[error("message body of {size} bytes exceeds the framable maximum of {max}")]
    BodyTooLarge {
        /// Byte length of the rejected body
        size: u64,
        /// Largest framable body length
        max: u64,
    },

    /// Header buffer is not exactly `HEADER_LENGTH` bytes.
    #[error("frame header must be exactly {expected} bytes, got {actual}")]
    HeaderLength {
        /// Required header width
        expected: usize,
        /// Width actually provided
        actual: usize,
    },

    /// Header bytes do not parse as a non-negative decimal length.
    #[error("frame header is not a decimal length: {0:?}")]
    InvalidHeader(String),

    /// Header length and body length disagree.
    #[error("header declares {declared} body bytes but {actual} were provided")]
    LengthMismatch {
        /// Length claimed by the header
        declared: usize,
        /// Length of the body actually present
        actual: usize,
    },

    /// Body bytes are not valid UTF-8.
    ///
    /// Bodies are surfaced as text or not at all; replacement
    /// characters are never substituted silently.
    #[error("frame body is not valid UTF-8")]
    InvalidBody(#[source] std::str::Utf8Error),
}
