//! Field kinds and definitions.

use crate::quant::{angle_to_u16, float_to_half, half_to_float, u16_to_angle};

/// How a float leaf is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FloatCodec {
    /// Raw IEEE 754 bits, lossless (4 bytes).
    Full,
    /// IEEE 754 binary16 (2 bytes).
    Half,
    /// Degrees quantized to `u16` (2 bytes).
    Angle16,
}

impl FloatCodec {
    /// Encoded size in bytes.
    #[must_use]
    pub const fn wire_size(self) -> usize {
        match self {
            Self::Full => 4,
            Self::Half | Self::Angle16 => 2,
        }
    }

    /// Returns the value a receiver reconstructs for `value`.
    #[must_use]
    pub fn quantize(self, value: f32) -> f32 {
        match self {
            Self::Full => value,
            Self::Half => half_to_float(float_to_half(value)),
            Self::Angle16 => u16_to_angle(angle_to_u16(value)),
        }
    }

    /// Encodes `value` as its wire bits, zero-extended to `u32`.
    ///
    /// Two values are equal on the wire exactly when their bits are equal.
    #[must_use]
    pub fn to_bits(self, value: f32) -> u32 {
        match self {
            Self::Full => value.to_bits(),
            Self::Half => u32::from(float_to_half(value)),
            Self::Angle16 => u32::from(angle_to_u16(value)),
        }
    }

    /// Decodes wire bits produced by [`FloatCodec::to_bits`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_bits(self, bits: u32) -> f32 {
        match self {
            Self::Full => f32::from_bits(bits),
            Self::Half => half_to_float(bits as u16),
            Self::Angle16 => u16_to_angle(bits as u16),
        }
    }
}

/// The encoding of one leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    /// 32-bit float carried with the given codec.
    Float(FloatCodec),
    /// Enumeration with `variants` values, carried in the narrowest
    /// unsigned integer that holds them.
    Enum { variants: u32 },
    /// NUL-terminated UTF-8 string of at most `max_len` bytes.
    Str { max_len: u16 },
}

impl FieldKind {
    /// Creates a float kind with raw IEEE 754 encoding.
    #[must_use]
    pub const fn f32() -> Self {
        Self::Float(FloatCodec::Full)
    }

    /// Creates a half-float kind.
    #[must_use]
    pub const fn half() -> Self {
        Self::Float(FloatCodec::Half)
    }

    /// Creates an angle kind.
    #[must_use]
    pub const fn angle() -> Self {
        Self::Float(FloatCodec::Angle16)
    }

    /// Creates an enumeration kind.
    #[must_use]
    pub const fn enumeration(variants: u32) -> Self {
        Self::Enum { variants }
    }

    /// Creates a bounded string kind.
    #[must_use]
    pub const fn string(max_len: u16) -> Self {
        Self::Str { max_len }
    }

    /// Encoded payload size in bytes, or `None` for strings.
    #[must_use]
    pub const fn wire_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 => Some(4),
            Self::U64 | Self::I64 => Some(8),
            Self::Float(codec) => Some(codec.wire_size()),
            Self::Enum { variants } => Some(enum_width(variants)),
            Self::Str { .. } => None,
        }
    }

    /// Upper bound of the encoded payload size in bytes.
    #[must_use]
    pub const fn max_wire_size(self) -> usize {
        match self {
            Self::Str { max_len } => max_len as usize + 1,
            _ => match self.wire_size() {
                Some(size) => size,
                None => 0,
            },
        }
    }
}

/// Bytes needed to carry an enum with `variants` values.
#[must_use]
pub const fn enum_width(variants: u32) -> usize {
    if variants <= 1 << 8 {
        1
    } else if variants <= 1 << 16 {
        2
    } else {
        4
    }
}

/// A named leaf field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_sizes() {
        assert_eq!(FieldKind::Bool.wire_size(), Some(1));
        assert_eq!(FieldKind::I64.wire_size(), Some(8));
        assert_eq!(FieldKind::f32().wire_size(), Some(4));
        assert_eq!(FieldKind::half().wire_size(), Some(2));
        assert_eq!(FieldKind::angle().wire_size(), Some(2));
        assert_eq!(FieldKind::string(15).wire_size(), None);
        assert_eq!(FieldKind::string(15).max_wire_size(), 16);
    }

    #[test]
    fn enum_width_boundaries() {
        assert_eq!(enum_width(2), 1);
        assert_eq!(enum_width(256), 1);
        assert_eq!(enum_width(257), 2);
        assert_eq!(enum_width(65536), 2);
        assert_eq!(enum_width(65537), 4);
    }

    #[test]
    fn float_codec_bits_match_quantized_value() {
        for codec in [FloatCodec::Full, FloatCodec::Half, FloatCodec::Angle16] {
            let bits = codec.to_bits(123.456);
            let quantized = codec.quantize(123.456);
            assert_eq!(codec.from_bits(bits).to_bits(), quantized.to_bits());
            assert_eq!(codec.to_bits(quantized), bits, "{codec:?}");
        }
    }

    #[test]
    fn field_def_construction() {
        let field = FieldDef::new("health", FieldKind::I16);
        assert_eq!(field.name, "health");
        assert_eq!(field.kind, FieldKind::I16);
    }
}
