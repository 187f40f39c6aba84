//! Property tests for the value codec

use memory_tree::codec::Codec;
use memory_tree::core::types::{Address, MemoryValue, PrimitiveKind, ValueKind};
use proptest::prelude::*;

fn encode(codec: &Codec, kind: &ValueKind, value: &MemoryValue, width: usize) -> Vec<u8> {
    let mut raw = vec![0u8; width];
    codec.encode(kind, value, &mut raw).unwrap();
    raw
}

/// Encodes `value` as `kind` and decodes it back
fn round_trip(kind: PrimitiveKind, value: MemoryValue) -> MemoryValue {
    let codec = Codec::default();
    let kind = ValueKind::primitive(kind);
    let raw = encode(&codec, &kind, &value, value.size());
    codec.decode_scalar(&kind, &raw).unwrap()
}

/// (backing width in bytes, bit offset, bit width) that fit together
fn bit_range() -> impl Strategy<Value = (u8, u8, u8)> {
    prop::sample::select(vec![1u8, 2, 4, 8])
        .prop_flat_map(|backing| (Just(backing), 0..backing * 8))
        .prop_flat_map(|(backing, offset)| (Just(backing), Just(offset), 1..=backing * 8 - offset))
}

proptest! {
    #[test]
    fn prop_i8_round_trip(v in any::<i8>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::I8, MemoryValue::I8(v)), MemoryValue::I8(v));
    }

    #[test]
    fn prop_i16_round_trip(v in any::<i16>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::I16, MemoryValue::I16(v)), MemoryValue::I16(v));
    }

    #[test]
    fn prop_i32_matches_native_layout(v in any::<i32>()) {
        let codec = Codec::default();
        let kind = ValueKind::primitive(PrimitiveKind::I32);
        let raw = encode(&codec, &kind, &MemoryValue::I32(v), 4);
        prop_assert_eq!(&raw, &v.to_le_bytes().to_vec());
        prop_assert_eq!(codec.decode_scalar(&kind, &raw).unwrap(), MemoryValue::I32(v));
    }

    #[test]
    fn prop_i64_round_trip(v in any::<i64>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::I64, MemoryValue::I64(v)), MemoryValue::I64(v));
    }

    #[test]
    fn prop_u8_round_trip(v in any::<u8>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::U8, MemoryValue::U8(v)), MemoryValue::U8(v));
    }

    #[test]
    fn prop_u16_round_trip(v in any::<u16>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::U16, MemoryValue::U16(v)), MemoryValue::U16(v));
    }

    #[test]
    fn prop_u32_round_trip(v in any::<u32>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::U32, MemoryValue::U32(v)), MemoryValue::U32(v));
    }

    #[test]
    fn prop_u64_round_trip(v in any::<u64>()) {
        prop_assert_eq!(round_trip(PrimitiveKind::U64, MemoryValue::U64(v)), MemoryValue::U64(v));
    }

    #[test]
    fn prop_f32_preserves_bits(bits in any::<u32>()) {
        match round_trip(PrimitiveKind::F32, MemoryValue::F32(f32::from_bits(bits))) {
            MemoryValue::F32(decoded) => prop_assert_eq!(decoded.to_bits(), bits),
            other => prop_assert!(false, "decoded {:?}", other),
        }
    }

    #[test]
    fn prop_f64_preserves_bits(bits in any::<u64>()) {
        match round_trip(PrimitiveKind::F64, MemoryValue::F64(f64::from_bits(bits))) {
            MemoryValue::F64(decoded) => prop_assert_eq!(decoded.to_bits(), bits),
            other => prop_assert!(false, "decoded {:?}", other),
        }
    }

    #[test]
    fn prop_pointer_width_four(raw in any::<u32>()) {
        let codec = Codec::new(4);
        let kind = ValueKind::untyped_pointer();
        let value = MemoryValue::Pointer(Address::new(u64::from(raw)));
        let bytes = encode(&codec, &kind, &value, 4);
        prop_assert_eq!(&bytes, &raw.to_le_bytes().to_vec());
        prop_assert_eq!(codec.decode_scalar(&kind, &bytes).unwrap(), value);
    }

    #[test]
    fn prop_short_input_never_decodes(len in 0usize..8) {
        let codec = Codec::default();
        let kind = ValueKind::primitive(PrimitiveKind::I64);
        prop_assert!(codec.decode_scalar(&kind, &vec![0xAA; len]).is_err());
    }

    #[test]
    fn prop_bitfield_write_isolated(
        (backing_width, offset, width) in bit_range(),
        backing in any::<u64>(),
        bits in any::<u64>(),
    ) {
        let size = usize::from(backing_width);
        let backing_mask = if size == 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
        let backing = backing & backing_mask;
        let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
        let bits = bits & mask;

        let codec = Codec::default();
        let kind = ValueKind::bitfield(backing_width, offset, width);
        let mut raw = backing.to_le_bytes()[..size].to_vec();
        codec.encode(&kind, &MemoryValue::Bits(bits), &mut raw).unwrap();
        prop_assert_eq!(raw.len(), size);

        let mut wide = [0u8; 8];
        wide[..size].copy_from_slice(&raw);
        let updated = u64::from_le_bytes(wide);
        let field = mask << offset;
        prop_assert_eq!(updated & !field, backing & !field);
        prop_assert_eq!(updated & field, bits << offset);
        prop_assert_eq!(codec.decode_scalar(&kind, &raw).unwrap(), MemoryValue::Bits(bits));
    }

    #[test]
    fn prop_bitfield_rejects_wide_values(offset in 0u8..8, width in 1u8..8) {
        prop_assume!(offset + width <= 8);
        let codec = Codec::default();
        let kind = ValueKind::bitfield(1, offset, width);
        let mut raw = vec![0u8];
        let too_big = MemoryValue::Bits(1u64 << width);
        prop_assert!(codec.encode(&kind, &too_big, &mut raw).is_err());
        prop_assert_eq!(raw, vec![0u8]);
    }

    #[test]
    fn prop_parse_accepts_display(v in any::<i16>()) {
        let codec = Codec::default();
        let kind = ValueKind::primitive(PrimitiveKind::I16);
        prop_assert_eq!(codec.parse_value(&kind, &v.to_string()).unwrap(), MemoryValue::I16(v));
    }

    #[test]
    fn prop_parse_rejects_out_of_range(v in 256i64..100_000) {
        let codec = Codec::default();
        let kind = ValueKind::primitive(PrimitiveKind::U8);
        prop_assert!(codec.parse_value(&kind, &v.to_string()).is_err());
    }
}

#[test]
fn test_array_decode_stops_at_short_span() {
    let codec = Codec::default();
    let element = ValueKind::primitive(PrimitiveKind::U16);
    let values = codec.decode_array(&element, 4, 2, &[1, 0, 2, 0, 3]);
    assert_eq!(values[0], Ok(MemoryValue::U16(1)));
    assert_eq!(values[1], Ok(MemoryValue::U16(2)));
    assert!(values[2].is_err());
    assert!(values[3].is_err());
}
