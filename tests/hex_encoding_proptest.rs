//! Property-based tests for the bandwidth hex encoding.
//!
//! The device decodes these words back to floats, so the encoding has to be
//! bit-exact in both directions.
#![forbid(unsafe_code)]

use nvme_regress::bitmap::TestBitmap;
use nvme_regress::report::{
    BandwidthRecord, RECORD_HEX_LEN, decode_records, encode_records, float_to_hex, hex_to_float,
};
use proptest::prelude::*;

fn finite_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(0.0_f32),
        Just(-0.0_f32),
        Just(f32::MIN_POSITIVE),
        Just(f32::MAX),
        Just(f32::MIN),
        -1.0e6_f32..1.0e6_f32,
        any::<u32>()
            .prop_map(f32::from_bits)
            .prop_filter("finite", |v| v.is_finite()),
    ]
}

fn single_bit() -> impl Strategy<Value = TestBitmap> {
    (0u32..32).prop_map(|shift| TestBitmap::from_bits(1 << shift))
}

fn record() -> impl Strategy<Value = BandwidthRecord> {
    (single_bit(), finite_f32(), finite_f32()).prop_map(|(bit, write_mbps, read_mbps)| {
        BandwidthRecord {
            bit,
            write_mbps,
            read_mbps,
        }
    })
}

proptest! {
    #[test]
    fn float_survives_hex(value in finite_f32()) {
        let back = hex_to_float(&float_to_hex(value)).unwrap();
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }

    #[test]
    fn hex_survives_float(word in "[0-9a-f]{8}") {
        let value = hex_to_float(&word).unwrap();
        prop_assert_eq!(float_to_hex(value), word);
    }

    #[test]
    fn encoded_words_are_fixed_width_lowercase(value in finite_f32()) {
        let hex = float_to_hex(value);
        prop_assert_eq!(hex.len(), 8);
        prop_assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn record_buffers_decode_in_order(records in prop::collection::vec(record(), 0..8)) {
        let encoded = encode_records(&records);
        prop_assert_eq!(encoded.len(), records.len() * RECORD_HEX_LEN);
        let decoded = decode_records(&encoded).unwrap();
        prop_assert_eq!(decoded.len(), records.len());
        for (got, want) in decoded.iter().zip(&records) {
            prop_assert_eq!(got.bit, want.bit);
            prop_assert_eq!(got.write_mbps.to_bits(), want.write_mbps.to_bits());
            prop_assert_eq!(got.read_mbps.to_bits(), want.read_mbps.to_bits());
        }
    }

    #[test]
    fn truncated_buffers_are_rejected(
        records in prop::collection::vec(record(), 1..4),
        cut in 1usize..RECORD_HEX_LEN,
    ) {
        let mut encoded = encode_records(&records);
        encoded.truncate(encoded.len() - cut);
        prop_assert!(decode_records(&encoded).is_err());
    }
}
