//! Property-based tests for frame encoding/decoding
//!
//! These verify the framing contract for ALL inputs, not just specific
//! examples: round-trips are identity, the header is always exactly
//! `HEADER_LENGTH` bytes, and lengths are counted in encoded bytes.

use bytes::Bytes;
use proptest::prelude::*;
use relaychat_proto::{Frame, HEADER_LENGTH, MAX_BODY_LEN, decode_header, encode_header};

proptest! {
    #[test]
    fn prop_text_round_trip(text in ".*") {
        let frame = Frame::encode(&text).expect("arbitrary test strings fit the header budget");

        // PROPERTY: decoding the body yields the original text
        prop_assert_eq!(frame.text().expect("body is valid UTF-8"), text.as_str());

        // PROPERTY: the header carries the body's byte length
        prop_assert_eq!(
            decode_header(frame.header()).expect("header decodes"),
            text.len()
        );
    }

    #[test]
    fn prop_header_is_always_fixed_width(text in ".*") {
        let frame = Frame::encode(&text).expect("should encode");
        prop_assert_eq!(frame.header().len(), HEADER_LENGTH);
    }

    #[test]
    fn prop_wire_round_trip(text in ".*") {
        let frame = Frame::encode(&text).expect("should encode");

        let mut wire = Vec::new();
        frame.write_to(&mut wire);
        prop_assert_eq!(wire.len(), frame.wire_len());

        let parsed = Frame::decode(&wire).expect("should decode");
        prop_assert_eq!(parsed, frame);
    }

    #[test]
    fn prop_header_length_round_trip(len in 0u64..=MAX_BODY_LEN) {
        let header = encode_header(len as usize).expect("within budget");
        prop_assert_eq!(decode_header(&header).expect("should decode"), len as usize);
    }

    #[test]
    fn prop_from_parts_enforces_consistency(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let header = encode_header(body.len()).expect("within budget");
        let frame = Frame::from_parts(header, Bytes::from(body.clone()))
            .expect("consistent parts are accepted");
        prop_assert_eq!(frame.body().as_ref(), body.as_slice());

        // A header off by one must be rejected
        let wrong = encode_header(body.len() + 1).expect("within budget");
        prop_assert!(Frame::from_parts(wrong, Bytes::from(body)).is_err());
    }
}
