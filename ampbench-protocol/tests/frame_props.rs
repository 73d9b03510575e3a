//! Property tests for the module frame codec.

use ampbench_protocol::module::frame::{Frame, FrameDecoder, FRAME_START, MAX_PAYLOAD_SIZE};
use proptest::prelude::*;

proptest! {
    /// Any encodable frame decodes back to itself.
    #[test]
    fn roundtrip(opcode in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE)) {
        let frame = Frame::new(opcode, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut decoder = FrameDecoder::new();
        let decoded = decoder.feed(&encoded).next().unwrap().unwrap();

        prop_assert_eq!(decoded.opcode, opcode);
        prop_assert_eq!(decoded.payload.as_slice(), payload.as_slice());
        prop_assert_eq!(decoder.buffered(), 0);
    }

    /// The bytes after the start marker always sum to zero mod 256.
    #[test]
    fn checksum_sums_to_zero(opcode in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE)) {
        let encoded = Frame::new(opcode, &payload).unwrap().encode_to_vec().unwrap();

        prop_assert_eq!(encoded[0], FRAME_START);
        let sum: u8 = encoded[1..].iter().fold(0u8, |a, &b| a.wrapping_add(b));
        prop_assert_eq!(sum, 0);
    }

    /// A valid frame is recovered no matter what garbage precedes it.
    #[test]
    fn resync_through_noise(noise in proptest::collection::vec(any::<u8>(), 0..64), opcode in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..32)) {
        let frame = Frame::new(opcode, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut stream = noise.clone();
        stream.extend_from_slice(&encoded);

        let mut decoder = FrameDecoder::new();
        let mut found = false;
        for result in decoder.feed(&stream) {
            if let Ok(f) = result {
                if f.opcode == opcode && f.payload.as_slice() == payload.as_slice() {
                    found = true;
                }
            }
        }
        // The noise may itself contain shorter valid frames that consume
        // part of ours; feeding the frame again after the stream settles
        // must always succeed
        if !found {
            for result in decoder.feed(&encoded) {
                if let Ok(f) = result {
                    if f.opcode == opcode && f.payload.as_slice() == payload.as_slice() {
                        found = true;
                    }
                }
            }
        }
        prop_assert!(found);
    }

    /// Split points never change the decode result.
    #[test]
    fn split_is_transparent(opcode in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..32), split in 0usize..40) {
        let frame = Frame::new(opcode, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        let split = split.min(encoded.len());

        let mut decoder = FrameDecoder::new();
        let mut frames = 0;
        for result in decoder.feed(&encoded[..split]) {
            if result.is_ok() {
                frames += 1;
            }
        }
        for result in decoder.feed(&encoded[split..]) {
            if result.is_ok() {
                frames += 1;
            }
        }
        prop_assert_eq!(frames, 1);
    }
}
