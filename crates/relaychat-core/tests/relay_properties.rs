//! Property-based tests for registry exclusion and frame reassembly.
//!
//! The two correctness-critical behaviors that must hold for all
//! inputs: `all_except` yields exactly the other registered peers, and
//! a frame split arbitrarily across receives reassembles exactly.

use std::collections::HashSet;

use proptest::prelude::*;
use relaychat_core::{FrameReader, Peer, PeerRegistry, ReadProgress};
use relaychat_proto::Frame;

proptest! {
    #[test]
    fn prop_all_except_excludes_sender_and_nobody_else(
        ids in prop::collection::hash_set(0u64..1000, 1..40),
        sender_index in any::<prop::sample::Index>(),
    ) {
        let mut registry = PeerRegistry::new();
        for id in &ids {
            let peer = Peer::new(Frame::encode(&format!("peer-{id}")).expect("encodes"))
                .expect("valid name");
            registry.insert(*id, peer).expect("unique ids");
        }

        let ids: Vec<u64> = ids.into_iter().collect();
        let sender = ids[sender_index.index(ids.len())];

        let yielded: Vec<u64> = registry.all_except(sender).map(|(id, _)| id).collect();
        let yielded_set: HashSet<u64> = yielded.iter().copied().collect();

        // Never the sender, no duplicates, everyone else exactly once
        prop_assert!(!yielded_set.contains(&sender));
        prop_assert_eq!(yielded.len(), yielded_set.len());

        let expected: HashSet<u64> = ids.iter().copied().filter(|id| *id != sender).collect();
        prop_assert_eq!(yielded_set, expected);
    }

    #[test]
    fn prop_reader_reassembles_any_chunking(
        texts in prop::collection::vec(".{0,80}", 1..6),
        chunk_sizes in prop::collection::vec(1usize..32, 1..64),
    ) {
        let mut wire = Vec::new();
        let originals: Vec<Frame> = texts
            .iter()
            .map(|text| {
                let frame = Frame::encode(text).expect("encodes");
                frame.write_to(&mut wire);
                frame
            })
            .collect();

        // Deliver the wire bytes in the proptest-chosen chunk sizes,
        // cycling if the stream outlasts the list.
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();
        let mut offset = 0;
        let mut chunk_cursor = 0;

        while offset < wire.len() {
            let chunk = chunk_sizes[chunk_cursor % chunk_sizes.len()];
            chunk_cursor += 1;

            let dst = reader.pending();
            let n = chunk.min(dst.len()).min(wire.len() - offset);
            dst[..n].copy_from_slice(&wire[offset..offset + n]);
            offset += n;

            match reader.advance(n).expect("well-formed stream") {
                ReadProgress::Frame(frame) => frames.push(frame),
                ReadProgress::NeedMore => {},
                ReadProgress::Closed { .. } => unreachable!("n > 0 never reports closure"),
            }
        }

        prop_assert_eq!(frames, originals);
    }
}
