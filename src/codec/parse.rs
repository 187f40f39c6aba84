//! Parsing user-supplied text into values of a declared kind

use super::{bit_mask, Codec};
use crate::core::types::{Address, EncodeError, MemoryValue, PrimitiveKind, ValueKind};

impl Codec {
    /// Parses `text` as a value of `kind`.
    ///
    /// Integers accept decimal or `0x` hex with an optional leading `-`;
    /// bitfields also accept `true`/`false`. Values that do not fit the
    /// declared width are [`EncodeError::OutOfRange`].
    pub fn parse_value(&self, kind: &ValueKind, text: &str) -> Result<MemoryValue, EncodeError> {
        let text = text.trim();
        match kind {
            ValueKind::Primitive(p) => parse_primitive(*p, text),
            ValueKind::Pointer { .. } => {
                let address = match text {
                    "null" | "nullptr" | "NULL" => Address::null(),
                    _ => Address::parse(text).map_err(|_| EncodeError::parse(text, kind))?,
                };
                let bits = (self.pointer_width() * 8) as u32;
                if bits < 64 && address.as_u64() >> bits != 0 {
                    return Err(EncodeError::out_of_range(address, bits));
                }
                Ok(MemoryValue::Pointer(address))
            }
            ValueKind::Bitfield {
                backing_width,
                bit_offset,
                bit_width,
            } => {
                let mask = bit_mask(*backing_width, *bit_offset, *bit_width).map_err(|_| {
                    EncodeError::UnsupportedWidth {
                        width: usize::from(*backing_width),
                    }
                })?;
                let bits = match text {
                    "true" => 1,
                    "false" => 0,
                    _ => {
                        let wide = parse_integer(text).ok_or_else(|| EncodeError::parse(text, kind))?;
                        u64::try_from(wide)
                            .map_err(|_| EncodeError::out_of_range(wide, u32::from(*bit_width)))?
                    }
                };
                if bits > mask {
                    return Err(EncodeError::out_of_range(bits, u32::from(*bit_width)));
                }
                Ok(MemoryValue::Bits(bits))
            }
            ValueKind::FixedArray { .. } | ValueKind::NestedStruct { .. } => {
                Err(EncodeError::NotScalar(kind.to_string()))
            }
        }
    }
}

fn parse_primitive(kind: PrimitiveKind, text: &str) -> Result<MemoryValue, EncodeError> {
    if !kind.is_supported() {
        return Err(EncodeError::UnsupportedWidth {
            width: usize::from(kind.width),
        });
    }
    if kind.float {
        return match kind.width {
            4 => text
                .parse::<f32>()
                .map(MemoryValue::F32)
                .map_err(|_| EncodeError::parse(text, kind)),
            _ => text
                .parse::<f64>()
                .map(MemoryValue::F64)
                .map_err(|_| EncodeError::parse(text, kind)),
        };
    }

    let wide = parse_integer(text).ok_or_else(|| EncodeError::parse(text, kind))?;
    let bits = u32::from(kind.width) * 8;
    let out_of_range = |_| EncodeError::out_of_range(wide, bits);
    let value = match (kind.signed, kind.width) {
        (true, 1) => MemoryValue::I8(i8::try_from(wide).map_err(out_of_range)?),
        (true, 2) => MemoryValue::I16(i16::try_from(wide).map_err(out_of_range)?),
        (true, 4) => MemoryValue::I32(i32::try_from(wide).map_err(out_of_range)?),
        (true, _) => MemoryValue::I64(i64::try_from(wide).map_err(out_of_range)?),
        (false, 1) => MemoryValue::U8(u8::try_from(wide).map_err(out_of_range)?),
        (false, 2) => MemoryValue::U16(u16::try_from(wide).map_err(out_of_range)?),
        (false, 4) => MemoryValue::U32(u32::try_from(wide).map_err(out_of_range)?),
        (false, _) => MemoryValue::U64(u64::try_from(wide).map_err(out_of_range)?),
    };
    Ok(value)
}

/// Decimal or `0x` hex, with an optional sign and `_` separators
fn parse_integer(text: &str) -> Option<i128> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let body = body.replace('_', "");
    let (digits, radix) = match body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (body.as_str(), 10),
    };
    // Only bare digits: the sign was consumed above
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}
