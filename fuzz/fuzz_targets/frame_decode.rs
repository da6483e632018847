//! Fuzz target for Frame::decode and header decoding
//!
//! Arbitrary byte sequences must never panic the decoder: every
//! malformed header, truncated body, or non-UTF-8 payload has to come
//! back as a structured error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaychat_proto::{Frame, decode_header};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a full frame: errors only, never a panic.
    if let Ok(frame) = Frame::decode(data) {
        // A frame that decoded must uphold its own invariant.
        assert_eq!(decode_header(frame.header()).unwrap(), frame.body_len());

        // Body text access must be panic-free on arbitrary bodies too.
        let _ = frame.text();
    }

    // Arbitrary bytes as a bare header.
    let _ = decode_header(data);
});
