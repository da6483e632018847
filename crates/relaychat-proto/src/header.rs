//! Fixed-width length header encoding and decoding.
//!
//! The header is `HEADER_LENGTH` bytes of ASCII decimal text,
//! left-justified and padded with spaces: a 5-byte body yields
//! `b"5         "`. The width is part of the wire format and never
//! varies; a peer that cannot produce exactly this many bytes is not
//! speaking the protocol.

use crate::errors::{ProtocolError, Result};

/// Width of the length header in bytes.
pub const HEADER_LENGTH: usize = 10;

/// Largest body length representable in `HEADER_LENGTH` decimal digits.
pub const MAX_BODY_LEN: u64 = 10u64.pow(HEADER_LENGTH as u32) - 1;

/// Encode a body length into a header.
///
/// # Errors
///
/// - `ProtocolError::BodyTooLarge` if `len` needs more than
///   `HEADER_LENGTH` decimal digits. An unchecked format would emit an
///   oversized header and desynchronize the stream, so the length is
///   validated up front.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_LENGTH]> {
    if len as u64 > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLarge { size: len as u64, max: MAX_BODY_LEN });
    }

    let digits = len.to_string();
    debug_assert!(digits.len() <= HEADER_LENGTH);

    let mut header = [b' '; HEADER_LENGTH];
    header[..digits.len()].copy_from_slice(digits.as_bytes());

    Ok(header)
}

/// Decode a header into a body length.
///
/// Padding is stripped from both sides before parsing, so a
/// right-justified header from a foreign implementation still decodes;
/// emission is always left-justified.
///
/// # Errors
///
/// - `ProtocolError::HeaderLength` if `bytes` is not exactly
///   `HEADER_LENGTH` long
/// - `ProtocolError::InvalidHeader` if the bytes do not parse as a
///   non-negative decimal integer
pub fn decode_header(bytes: &[u8]) -> Result<usize> {
    if bytes.len() != HEADER_LENGTH {
        return Err(ProtocolError::HeaderLength {
            expected: HEADER_LENGTH,
            actual: bytes.len(),
        });
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| ProtocolError::InvalidHeader(String::from_utf8_lossy(bytes).into_owned()))?;

    let trimmed = text.trim();
    let len: u64 = trimmed
        .parse()
        .map_err(|_| ProtocolError::InvalidHeader(trimmed.to_string()))?;

    Ok(len as usize)
}
