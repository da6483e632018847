//! Incremental frame assembly over a byte stream.
//!
//! A stream socket has no message boundaries and a single receive may
//! deliver any prefix of a frame. [`FrameReader`] makes the
//! accumulation explicit: it is a two-phase state machine
//! (awaiting-header, awaiting-body) that tells the caller exactly which
//! bytes to read next ([`FrameReader::pending`]) and consumes whatever
//! the transport actually delivered ([`FrameReader::advance`]).
//!
//! Because `pending` never extends past the end of the frame being
//! assembled, a caller reading into it cannot over-read - the relay's
//! one-frame-per-ready-socket discipline is preserved and any following
//! frame stays buffered in the transport.
//!
//! The identity registration frame and steady-state message frames go
//! through this same path; a frame split at any byte offset across any
//! number of receives reassembles exactly.

use bytes::{Bytes, BytesMut};

use relaychat_proto::{Frame, HEADER_LENGTH, Result, decode_header};

/// Outcome of feeding received bytes into a [`FrameReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadProgress {
    /// The current frame is still incomplete; read into
    /// [`FrameReader::pending`] again.
    NeedMore,

    /// A complete frame was assembled. The reader has reset and is
    /// ready for the next frame's header.
    Frame(Frame),

    /// The peer closed the stream (zero-byte read).
    Closed {
        /// True if closure happened inside a frame rather than at a
        /// frame boundary
        mid_frame: bool,
    },
}

/// Accumulation phase: which part of the frame is being filled.
#[derive(Debug)]
enum Phase {
    /// Collecting the fixed-width header
    AwaitingHeader {
        buf: [u8; HEADER_LENGTH],
        filled: usize,
    },
    /// Header decoded; collecting the declared number of body bytes
    AwaitingBody {
        header: [u8; HEADER_LENGTH],
        body: BytesMut,
        filled: usize,
    },
}

/// Single-frame incremental reader.
///
/// After [`FrameReader::advance`] returns an error the reader is spent:
/// the stream position is no longer frame-aligned and the connection
/// must be dropped, exactly as for any other framing violation.
#[derive(Debug)]
pub struct FrameReader {
    phase: Phase,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Create a reader awaiting a frame header.
    #[must_use]
    pub fn new() -> Self {
        Self { phase: Phase::AwaitingHeader { buf: [0; HEADER_LENGTH], filled: 0 } }
    }

    /// The byte range the next receive must fill.
    ///
    /// Always non-empty between calls to `advance`; its length shrinks
    /// as bytes accumulate and never spans past the current frame.
    pub fn pending(&mut self) -> &mut [u8] {
        match &mut self.phase {
            Phase::AwaitingHeader { buf, filled } => &mut buf[*filled..],
            Phase::AwaitingBody { body, filled, .. } => &mut body[*filled..],
        }
    }

    /// Record that `n` bytes were written into [`FrameReader::pending`].
    ///
    /// `n == 0` signals stream closure. A partial fill is normal and
    /// yields [`ReadProgress::NeedMore`]; completion of the header
    /// phase decodes the length and switches to the body phase (or
    /// yields an empty-body frame immediately).
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if the completed header does not decode as a
    ///   length. The caller must treat this as fatal for the
    ///   connection.
    pub fn advance(&mut self, n: usize) -> Result<ReadProgress> {
        if n == 0 {
            let mid_frame = match &self.phase {
                Phase::AwaitingHeader { filled, .. } => *filled > 0,
                Phase::AwaitingBody { .. } => true,
            };
            return Ok(ReadProgress::Closed { mid_frame });
        }

        match &mut self.phase {
            Phase::AwaitingHeader { buf, filled } => {
                debug_assert!(n <= HEADER_LENGTH - *filled, "advance past pending range");
                *filled += n;

                if *filled < HEADER_LENGTH {
                    return Ok(ReadProgress::NeedMore);
                }

                let header = *buf;
                let declared = decode_header(&header)?;

                if declared == 0 {
                    self.phase = Phase::AwaitingHeader { buf: [0; HEADER_LENGTH], filled: 0 };
                    let frame = Frame::from_parts(header, Bytes::new())?;
                    return Ok(ReadProgress::Frame(frame));
                }

                self.phase =
                    Phase::AwaitingBody { header, body: BytesMut::zeroed(declared), filled: 0 };
                Ok(ReadProgress::NeedMore)
            },

            Phase::AwaitingBody { header, body, filled } => {
                debug_assert!(n <= body.len() - *filled, "advance past pending range");
                *filled += n;

                if *filled < body.len() {
                    return Ok(ReadProgress::NeedMore);
                }

                let header = *header;
                let body = std::mem::take(body).freeze();
                self.phase = Phase::AwaitingHeader { buf: [0; HEADER_LENGTH], filled: 0 };

                let frame = Frame::from_parts(header, body)?;
                Ok(ReadProgress::Frame(frame))
            },
        }
    }
}
