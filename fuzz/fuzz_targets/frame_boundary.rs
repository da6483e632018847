//! Fuzz target for frame reassembly across arbitrary receive boundaries
//!
//! # Strategy
//!
//! Encode a fuzzer-chosen sequence of messages, then replay the wire
//! bytes through a `FrameReader` split at fuzzer-chosen chunk sizes.
//!
//! # Invariants
//!
//! - Reassembled frames MUST equal the originals, in order
//! - No chunking may produce an error or a spurious closure
//! - The reader never asks for bytes past the frame being assembled

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relaychat_core::{FrameReader, ReadProgress};
use relaychat_proto::Frame;

#[derive(Debug, Arbitrary)]
struct Scenario {
    messages: Vec<String>,
    chunk_sizes: Vec<u8>,
}

fuzz_target!(|scenario: Scenario| {
    let mut wire = Vec::new();
    let mut originals = Vec::new();

    for text in scenario.messages.iter().take(16) {
        let frame = Frame::encode(text).expect("fuzzer strings fit the header budget");
        frame.write_to(&mut wire);
        originals.push(frame);
    }

    let mut reader = FrameReader::new();
    let mut frames = Vec::new();
    let mut offset = 0;
    let mut cursor = 0;

    while offset < wire.len() {
        let chunk = if scenario.chunk_sizes.is_empty() {
            1
        } else {
            usize::from(scenario.chunk_sizes[cursor % scenario.chunk_sizes.len()]).max(1)
        };
        cursor += 1;

        let dst = reader.pending();
        assert!(!dst.is_empty(), "reader must always want bytes mid-stream");

        let n = chunk.min(dst.len()).min(wire.len() - offset);
        dst[..n].copy_from_slice(&wire[offset..offset + n]);
        offset += n;

        match reader.advance(n).expect("well-formed stream never errors") {
            ReadProgress::Frame(frame) => frames.push(frame),
            ReadProgress::NeedMore => {},
            ReadProgress::Closed { .. } => panic!("spurious closure on non-empty read"),
        }
    }

    assert_eq!(frames, originals);
});
