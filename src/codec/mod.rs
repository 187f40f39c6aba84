//! Typed codec: bytes to values and back, per value kind
//!
//! All multi-byte values are little-endian. Decoding never substitutes a
//! default for missing bytes: anything shorter than the declared width is a
//! [`DecodeError::ShortRead`].

mod parse;

use crate::core::types::{Address, DecodeError, EncodeError, MemoryValue, PrimitiveKind, ValueKind};

/// Result of decoding the bytes of one field
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A primitive, pointer or bitfield value
    Scalar(MemoryValue),
    /// Per-element results of an array of scalars
    Elements(Vec<Result<MemoryValue, DecodeError>>),
    /// Structs, and arrays whose elements are containers, carry no value of their own
    Container,
}

/// Encoder/decoder for one target pointer width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    pointer_width: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(8)
    }
}

impl Codec {
    /// Creates a codec for targets with `pointer_width`-byte pointers (4 or 8)
    pub const fn new(pointer_width: usize) -> Self {
        Codec { pointer_width }
    }

    pub const fn pointer_width(&self) -> usize {
        self.pointer_width
    }

    /// Number of bytes a scalar of `kind` occupies, or `None` for containers
    pub fn scalar_width(&self, kind: &ValueKind) -> Option<usize> {
        kind.scalar_width(self.pointer_width)
    }

    /// Decodes the bytes of a field of `kind`
    ///
    /// For arrays of scalars `bytes` is the whole array span; elements past
    /// the end of a short span decode as [`DecodeError::ShortRead`].
    pub fn decode(&self, kind: &ValueKind, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        match kind {
            ValueKind::NestedStruct { .. } => Ok(Decoded::Container),
            ValueKind::FixedArray { element, count } => match self.scalar_width(element) {
                Some(width) => Ok(Decoded::Elements(
                    self.decode_array(element, *count, width, bytes),
                )),
                None => Ok(Decoded::Container),
            },
            scalar => self.decode_scalar(scalar, bytes).map(Decoded::Scalar),
        }
    }

    /// Decodes one primitive, pointer or bitfield from the front of `bytes`
    pub fn decode_scalar(&self, kind: &ValueKind, bytes: &[u8]) -> Result<MemoryValue, DecodeError> {
        match kind {
            ValueKind::Primitive(p) => decode_primitive(*p, bytes),
            ValueKind::Pointer { .. } => {
                read_unsigned(bytes, self.pointer_width).map(|raw| MemoryValue::Pointer(Address::new(raw)))
            }
            ValueKind::Bitfield {
                backing_width,
                bit_offset,
                bit_width,
            } => {
                let mask = bit_mask(*backing_width, *bit_offset, *bit_width)?;
                let backing = read_unsigned(bytes, usize::from(*backing_width))?;
                Ok(MemoryValue::Bits((backing >> bit_offset) & mask))
            }
            ValueKind::NestedStruct { .. } | ValueKind::FixedArray { .. } => {
                Err(DecodeError::NotScalar(kind.to_string()))
            }
        }
    }

    /// Decodes `count` elements laid out every `stride` bytes
    ///
    /// Whole elements covered by `bytes` decode normally; the rest are
    /// reported as short reads instead of failing the whole array.
    pub fn decode_array(
        &self,
        element: &ValueKind,
        count: usize,
        stride: usize,
        bytes: &[u8],
    ) -> Vec<Result<MemoryValue, DecodeError>> {
        let width = self.scalar_width(element).unwrap_or(stride);
        (0..count)
            .map(|i| {
                let start = i.saturating_mul(stride);
                match bytes.get(start..start.saturating_add(width)) {
                    Some(slice) => self.decode_scalar(element, slice),
                    None => Err(DecodeError::short_read(
                        width,
                        bytes.len().saturating_sub(start).min(width),
                    )),
                }
            })
            .collect()
    }

    /// Encodes `value` into `raw`.
    ///
    /// For bitfields `raw` must already hold the current backing bytes: only
    /// the field's bits are replaced, every other bit is preserved.
    pub fn encode(
        &self,
        kind: &ValueKind,
        value: &MemoryValue,
        raw: &mut [u8],
    ) -> Result<(), EncodeError> {
        match kind {
            ValueKind::Primitive(p) => {
                if value.primitive_kind() != Some(p.normalized()) {
                    return Err(EncodeError::kind_mismatch(p, value.type_name()));
                }
                let bytes = primitive_bytes(value);
                put(raw, &bytes)
            }
            ValueKind::Pointer { .. } => {
                let MemoryValue::Pointer(address) = value else {
                    return Err(EncodeError::kind_mismatch(kind, value.type_name()));
                };
                write_unsigned(raw, address.as_u64(), self.pointer_width)
            }
            ValueKind::Bitfield {
                backing_width,
                bit_offset,
                bit_width,
            } => {
                let MemoryValue::Bits(bits) = value else {
                    return Err(EncodeError::kind_mismatch(kind, value.type_name()));
                };
                let mask = bit_mask(*backing_width, *bit_offset, *bit_width)
                    .map_err(|_| EncodeError::UnsupportedWidth {
                        width: usize::from(*backing_width),
                    })?;
                if *bits > mask {
                    return Err(EncodeError::out_of_range(bits, u32::from(*bit_width)));
                }
                let width = usize::from(*backing_width);
                let backing = raw
                    .get(..width)
                    .ok_or(EncodeError::BufferTooSmall {
                        expected: width,
                        actual: raw.len(),
                    })
                    .and_then(|b| {
                        read_unsigned(b, width).map_err(|_| EncodeError::UnsupportedWidth { width })
                    })?;
                let updated = (backing & !(mask << bit_offset)) | (bits << bit_offset);
                write_unsigned(raw, updated, width)
            }
            ValueKind::NestedStruct { .. } | ValueKind::FixedArray { .. } => {
                Err(EncodeError::NotScalar(kind.to_string()))
            }
        }
    }
}

fn decode_primitive(kind: PrimitiveKind, bytes: &[u8]) -> Result<MemoryValue, DecodeError> {
    let width = usize::from(kind.width);
    if !kind.is_supported() {
        return Err(DecodeError::UnsupportedWidth { width });
    }
    let raw = bytes
        .get(..width)
        .ok_or(DecodeError::short_read(width, bytes.len()))?;

    let value = match (kind.float, kind.signed, width) {
        (true, _, 4) => MemoryValue::F32(f32::from_le_bytes(array(raw))),
        (true, _, _) => MemoryValue::F64(f64::from_le_bytes(array(raw))),
        (false, true, 1) => MemoryValue::I8(i8::from_le_bytes(array(raw))),
        (false, true, 2) => MemoryValue::I16(i16::from_le_bytes(array(raw))),
        (false, true, 4) => MemoryValue::I32(i32::from_le_bytes(array(raw))),
        (false, true, _) => MemoryValue::I64(i64::from_le_bytes(array(raw))),
        (false, false, 1) => MemoryValue::U8(raw[0]),
        (false, false, 2) => MemoryValue::U16(u16::from_le_bytes(array(raw))),
        (false, false, 4) => MemoryValue::U32(u32::from_le_bytes(array(raw))),
        (false, false, _) => MemoryValue::U64(u64::from_le_bytes(array(raw))),
    };
    Ok(value)
}

fn primitive_bytes(value: &MemoryValue) -> Vec<u8> {
    match value {
        MemoryValue::I8(v) => v.to_le_bytes().to_vec(),
        MemoryValue::I16(v) => v.to_le_bytes().to_vec(),
        MemoryValue::I32(v) => v.to_le_bytes().to_vec(),
        MemoryValue::I64(v) => v.to_le_bytes().to_vec(),
        MemoryValue::U8(v) => v.to_le_bytes().to_vec(),
        MemoryValue::U16(v) => v.to_le_bytes().to_vec(),
        MemoryValue::U32(v) => v.to_le_bytes().to_vec(),
        MemoryValue::U64(v) => v.to_le_bytes().to_vec(),
        MemoryValue::F32(v) => v.to_le_bytes().to_vec(),
        MemoryValue::F64(v) => v.to_le_bytes().to_vec(),
        MemoryValue::Pointer(a) => a.as_u64().to_le_bytes().to_vec(),
        MemoryValue::Bits(v) => v.to_le_bytes().to_vec(),
    }
}

/// Copies a fixed-size prefix; callers have already checked the length
fn array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

/// Mask of `bit_width` low bits, after checking the range fits the backing integer
fn bit_mask(backing_width: u8, bit_offset: u8, bit_width: u8) -> Result<u64, DecodeError> {
    let bits = u32::from(backing_width) * 8;
    let end = u32::from(bit_offset) + u32::from(bit_width);
    if !matches!(backing_width, 1 | 2 | 4 | 8) || bit_width == 0 || end > bits {
        return Err(DecodeError::InvalidBitRange {
            backing_width,
            bit_offset,
            bit_width,
        });
    }
    Ok(if bit_width == 64 {
        u64::MAX
    } else {
        (1u64 << bit_width) - 1
    })
}

fn read_unsigned(bytes: &[u8], width: usize) -> Result<u64, DecodeError> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(DecodeError::UnsupportedWidth { width });
    }
    let raw = bytes
        .get(..width)
        .ok_or(DecodeError::short_read(width, bytes.len()))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(raw);
    Ok(u64::from_le_bytes(buf))
}

fn write_unsigned(raw: &mut [u8], value: u64, width: usize) -> Result<(), EncodeError> {
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(EncodeError::UnsupportedWidth { width });
    }
    let bits = (width * 8) as u32;
    if bits < 64 && value >> bits != 0 {
        return Err(EncodeError::out_of_range(format!("{:#x}", value), bits));
    }
    put(raw, &value.to_le_bytes()[..width])
}

fn put(raw: &mut [u8], bytes: &[u8]) -> Result<(), EncodeError> {
    let actual = raw.len();
    let dest = raw
        .get_mut(..bytes.len())
        .ok_or(EncodeError::BufferTooSmall {
            expected: bytes.len(),
            actual,
        })?;
    dest.copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_kind() -> ValueKind {
        ValueKind::primitive(PrimitiveKind::F32)
    }

    #[test]
    fn test_decode_vec3_floats() {
        let bytes = [0x00, 0x00, 0x80, 0x3F, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x40, 0x40];
        let codec = Codec::default();
        assert_eq!(
            codec.decode_scalar(&f32_kind(), &bytes[0..4]).unwrap(),
            MemoryValue::F32(1.0)
        );
        assert_eq!(
            codec.decode_scalar(&f32_kind(), &bytes[4..8]).unwrap(),
            MemoryValue::F32(2.0)
        );
        assert_eq!(
            codec.decode_scalar(&f32_kind(), &bytes[8..12]).unwrap(),
            MemoryValue::F32(3.0)
        );
    }

    #[test]
    fn test_exact_signedness() {
        let codec = Codec::default();
        let bytes = [0xFF, 0xFF];
        assert_eq!(
            codec
                .decode_scalar(&ValueKind::primitive(PrimitiveKind::I16), &bytes)
                .unwrap(),
            MemoryValue::I16(-1)
        );
        assert_eq!(
            codec
                .decode_scalar(&ValueKind::primitive(PrimitiveKind::U16), &bytes)
                .unwrap(),
            MemoryValue::U16(0xFFFF)
        );
    }

    #[test]
    fn test_short_read_is_an_error() {
        let codec = Codec::default();
        let err = codec
            .decode_scalar(&ValueKind::primitive(PrimitiveKind::U32), &[1, 2])
            .unwrap_err();
        assert_eq!(err, DecodeError::short_read(4, 2));
    }

    #[test]
    fn test_unsupported_width() {
        let codec = Codec::default();
        let odd = ValueKind::primitive(PrimitiveKind {
            width: 3,
            signed: false,
            float: false,
        });
        assert_eq!(
            codec.decode_scalar(&odd, &[0; 8]).unwrap_err(),
            DecodeError::UnsupportedWidth { width: 3 }
        );
    }

    #[test]
    fn test_pointer_widths() {
        let kind = ValueKind::untyped_pointer();
        let bytes = 0x1122_3344_5566_7788u64.to_le_bytes();

        assert_eq!(
            Codec::new(8).decode_scalar(&kind, &bytes).unwrap(),
            MemoryValue::Pointer(Address::new(0x1122_3344_5566_7788))
        );
        assert_eq!(
            Codec::new(4).decode_scalar(&kind, &bytes).unwrap(),
            MemoryValue::Pointer(Address::new(0x5566_7788))
        );

        let mut raw = [0u8; 4];
        let err = Codec::new(4)
            .encode(&kind, &MemoryValue::Pointer(Address::new(1 << 40)), &mut raw)
            .unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { bits: 32, .. }));
    }

    #[test]
    fn test_array_short_span() {
        let codec = Codec::default();
        let kind = ValueKind::array(ValueKind::primitive(PrimitiveKind::U16), 4);
        let decoded = codec.decode(&kind, &[1, 0, 2, 0, 3]).unwrap();

        let Decoded::Elements(elements) = decoded else {
            panic!("expected elements");
        };
        assert_eq!(elements.len(), 4);
        assert_eq!(elements[0], Ok(MemoryValue::U16(1)));
        assert_eq!(elements[1], Ok(MemoryValue::U16(2)));
        assert_eq!(elements[2], Err(DecodeError::short_read(2, 1)));
        assert_eq!(elements[3], Err(DecodeError::short_read(2, 0)));
    }

    #[test]
    fn test_array_of_structs_is_container() {
        let codec = Codec::default();
        let kind = ValueKind::array(ValueKind::nested("Vec3"), 2);
        assert_eq!(codec.decode(&kind, &[]).unwrap(), Decoded::Container);
        assert_eq!(
            codec.decode(&ValueKind::nested("Vec3"), &[]).unwrap(),
            Decoded::Container
        );
    }

    #[test]
    fn test_bitfield_decode() {
        let codec = Codec::default();
        // 0b1011_0100: bits 2..5 hold 0b101
        let kind = ValueKind::bitfield(1, 2, 3);
        assert_eq!(
            codec.decode_scalar(&kind, &[0b1011_0100]).unwrap(),
            MemoryValue::Bits(0b101)
        );
    }

    #[test]
    fn test_bitfield_encode_preserves_other_bits() {
        let codec = Codec::default();
        let kind = ValueKind::bitfield(2, 4, 4);
        let mut raw = 0xABCDu16.to_le_bytes();

        codec.encode(&kind, &MemoryValue::Bits(0x3), &mut raw).unwrap();
        assert_eq!(u16::from_le_bytes(raw), 0xAB3D);

        let err = codec
            .encode(&kind, &MemoryValue::Bits(0x10), &mut raw)
            .unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { bits: 4, .. }));
        assert_eq!(u16::from_le_bytes(raw), 0xAB3D);
    }

    #[test]
    fn test_full_width_bitfield() {
        let codec = Codec::default();
        let kind = ValueKind::bitfield(8, 0, 64);
        let mut raw = [0u8; 8];
        codec
            .encode(&kind, &MemoryValue::Bits(u64::MAX), &mut raw)
            .unwrap();
        assert_eq!(
            codec.decode_scalar(&kind, &raw).unwrap(),
            MemoryValue::Bits(u64::MAX)
        );
    }

    #[test]
    fn test_encode_rejects_mismatched_kind() {
        let codec = Codec::default();
        let mut raw = [0u8; 8];
        let err = codec
            .encode(&f32_kind(), &MemoryValue::F64(1.0), &mut raw)
            .unwrap_err();
        assert_eq!(err, EncodeError::kind_mismatch("f32", "f64"));

        let err = codec
            .encode(&ValueKind::nested("Vec3"), &MemoryValue::U8(1), &mut raw)
            .unwrap_err();
        assert_eq!(err, EncodeError::NotScalar("Vec3".to_string()));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let codec = Codec::default();
        let mut raw = [0u8; 2];
        let err = codec
            .encode(
                &ValueKind::primitive(PrimitiveKind::U32),
                &MemoryValue::U32(1),
                &mut raw,
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::BufferTooSmall { expected: 4, .. }));
    }

    #[test]
    fn test_encode_then_decode_float() {
        let codec = Codec::default();
        let mut raw = [0u8; 4];
        codec
            .encode(&f32_kind(), &MemoryValue::F32(5.0), &mut raw)
            .unwrap();
        assert_eq!(raw, 5.0f32.to_le_bytes());
    }
}
