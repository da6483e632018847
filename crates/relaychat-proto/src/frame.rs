//! Frame type combining a length header and a text body.
//!
//! A `Frame` is one wire unit: `[header: HEADER_LENGTH bytes] +
//! [body: variable bytes]`. It is immutable once constructed and every
//! constructor enforces the framing invariant, so a `Frame` in hand is
//! always internally consistent and `write_to` cannot fail.

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    header::{HEADER_LENGTH, decode_header, encode_header},
};

/// One length-prefixed message unit.
///
/// # Invariants
///
/// - Size consistency: `decode_header(header) == body.len()` always.
///   Enforced by [`Frame::encode`] and [`Frame::from_parts`], verified
///   by [`Frame::decode`].
/// - The body is raw bytes off the wire; UTF-8 validity is checked on
///   access via [`Frame::text`], not assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Fixed-width length header
    header: [u8; HEADER_LENGTH],
    /// Body bytes (UTF-8 text when well-formed)
    body: Bytes,
}

impl Frame {
    /// Encode a text payload into a frame.
    ///
    /// The header is computed from the body's *byte* length; multi-byte
    /// characters are never undercounted.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BodyTooLarge` if the encoded text exceeds the
    ///   header's digit budget. The send must be refused, not truncated.
    pub fn encode(text: &str) -> Result<Self> {
        let body = Bytes::copy_from_slice(text.as_bytes());
        let header = encode_header(body.len())?;

        Ok(Self { header, body })
    }

    /// Assemble a frame from a header and body received off the wire.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HeaderLength` / `ProtocolError::InvalidHeader`
    ///   if the header does not decode
    /// - `ProtocolError::LengthMismatch` if the decoded length disagrees
    ///   with `body.len()`
    pub fn from_parts(header: [u8; HEADER_LENGTH], body: Bytes) -> Result<Self> {
        let declared = decode_header(&header)?;

        if declared != body.len() {
            return Err(ProtocolError::LengthMismatch { declared, actual: body.len() });
        }

        Ok(Self { header, body })
    }

    /// Decode a frame from a contiguous buffer.
    ///
    /// Reads exactly `HEADER_LENGTH + declared` bytes; trailing data is
    /// ignored, so a buffer holding several frames decodes its first.
    ///
    /// # Errors
    ///
    /// - header errors as in [`Frame::from_parts`]
    /// - `ProtocolError::LengthMismatch` if the buffer holds fewer body
    ///   bytes than the header declares
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH {
            return Err(ProtocolError::HeaderLength {
                expected: HEADER_LENGTH,
                actual: bytes.len(),
            });
        }

        let mut header = [0u8; HEADER_LENGTH];
        header.copy_from_slice(&bytes[..HEADER_LENGTH]);

        let declared = decode_header(&header)?;
        let available = bytes.len() - HEADER_LENGTH;

        if available < declared {
            return Err(ProtocolError::LengthMismatch { declared, actual: available });
        }

        let body = Bytes::copy_from_slice(&bytes[HEADER_LENGTH..HEADER_LENGTH + declared]);

        Ok(Self { header, body })
    }

    /// The raw header bytes.
    #[must_use]
    pub fn header(&self) -> &[u8; HEADER_LENGTH] {
        &self.header
    }

    /// The raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body length in bytes.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Total size on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        HEADER_LENGTH + self.body.len()
    }

    /// The body as text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidBody` if the body is not valid UTF-8
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(ProtocolError::InvalidBody)
    }

    /// Write the frame to a buffer: header then body.
    pub fn write_to(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header);
        dst.put_slice(&self.body);
    }
}
