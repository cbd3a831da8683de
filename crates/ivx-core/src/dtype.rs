//! Semantic element types.
//!
//! A [`DType`] is a tag, not a storage format: every integer dtype is held as
//! [`Literal::I64`] and every floating dtype as [`Literal::F64Bits`]. What the
//! tag controls is the *value range*. Casting a literal into a dtype wraps
//! integers to the dtype's width and rounds floats to its precision, so a
//! tensor tagged `float16` only ever holds values representable in half
//! precision.

use crate::Literal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "float16")]
    F16,
    #[serde(rename = "bfloat16")]
    BF16,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DTypeKind {
    Bool,
    Unsigned,
    Signed,
    Float,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Bool,
        DType::U8,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::F16,
        DType::BF16,
        DType::F32,
        DType::F64,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "uint8",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| dtype.as_str() == name)
    }

    #[must_use]
    pub fn kind(self) -> DTypeKind {
        match self {
            Self::Bool => DTypeKind::Bool,
            Self::U8 => DTypeKind::Unsigned,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => DTypeKind::Signed,
            Self::F16 | Self::BF16 | Self::F32 | Self::F64 => DTypeKind::Float,
        }
    }

    #[must_use]
    pub fn bit_width(self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::U8 | Self::I8 => 8,
            Self::I16 | Self::F16 | Self::BF16 => 16,
            Self::I32 | Self::F32 => 32,
            Self::I64 | Self::F64 => 64,
        }
    }

    #[must_use]
    pub fn is_floating(self) -> bool {
        self.kind() == DTypeKind::Float
    }

    /// Signed or unsigned integer. `bool` is not integral.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(self.kind(), DTypeKind::Signed | DTypeKind::Unsigned)
    }

    /// Convert a literal into this dtype's canonical representation.
    #[must_use]
    pub fn cast_literal(self, literal: Literal) -> Literal {
        match self.kind() {
            DTypeKind::Bool => Literal::Bool(literal_truthy(literal)),
            DTypeKind::Signed | DTypeKind::Unsigned => {
                Literal::I64(self.wrap_integer(literal_to_i64(literal)))
            }
            DTypeKind::Float => Literal::from_f64(self.round_float(literal_to_f64(literal))),
        }
    }

    fn wrap_integer(self, value: i64) -> i64 {
        match self {
            Self::U8 => i64::from(value as u8),
            Self::I8 => i64::from(value as i8),
            Self::I16 => i64::from(value as i16),
            Self::I32 => i64::from(value as i32),
            _ => value,
        }
    }

    fn round_float(self, value: f64) -> f64 {
        match self {
            Self::F16 => half::f16::from_f64(value).to_f64(),
            Self::BF16 => half::bf16::from_f64(value).to_f64(),
            Self::F32 => f64::from(value as f32),
            _ => value,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn literal_truthy(literal: Literal) -> bool {
    match literal {
        Literal::Bool(value) => value,
        Literal::I64(value) => value != 0,
        Literal::F64Bits(bits) => f64::from_bits(bits) != 0.0,
    }
}

fn literal_to_i64(literal: Literal) -> i64 {
    match literal {
        Literal::Bool(value) => i64::from(value),
        Literal::I64(value) => value,
        // `as` saturates and maps NaN to zero.
        Literal::F64Bits(bits) => f64::from_bits(bits) as i64,
    }
}

fn literal_to_f64(literal: Literal) -> f64 {
    match literal {
        Literal::Bool(value) => f64::from(u8::from(value)),
        Literal::I64(value) => value as f64,
        Literal::F64Bits(bits) => f64::from_bits(bits),
    }
}

/// Smallest dtype that can hold values of both operands without silent
/// narrowing.
///
/// `bool` promotes to anything. Mixing integers with floats yields the float
/// operand. Two floats of equal width but different layout (`float16` and
/// `bfloat16`) meet at `float32`. `uint8` with `int8` meets at `int16`.
#[must_use]
pub fn promote_types(lhs: DType, rhs: DType) -> DType {
    if lhs == rhs {
        return lhs;
    }

    match (lhs.kind(), rhs.kind()) {
        (DTypeKind::Bool, _) => rhs,
        (_, DTypeKind::Bool) => lhs,
        (DTypeKind::Float, DTypeKind::Float) => {
            if lhs.bit_width() == rhs.bit_width() {
                DType::F32
            } else if lhs.bit_width() > rhs.bit_width() {
                lhs
            } else {
                rhs
            }
        }
        (DTypeKind::Float, _) => lhs,
        (_, DTypeKind::Float) => rhs,
        (DTypeKind::Unsigned, DTypeKind::Signed) => promote_unsigned_signed(lhs, rhs),
        (DTypeKind::Signed, DTypeKind::Unsigned) => promote_unsigned_signed(rhs, lhs),
        _ => {
            if lhs.bit_width() >= rhs.bit_width() {
                lhs
            } else {
                rhs
            }
        }
    }
}

fn promote_unsigned_signed(unsigned: DType, signed: DType) -> DType {
    if signed.bit_width() > unsigned.bit_width() {
        signed
    } else {
        match unsigned.bit_width() {
            8 => DType::I16,
            16 => DType::I32,
            _ => DType::I64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, DTypeKind, promote_types};
    use crate::Literal;

    #[test]
    fn bit_widths_follow_names() {
        assert_eq!(DType::Bool.bit_width(), 1);
        assert_eq!(DType::I8.bit_width(), 8);
        assert_eq!(DType::BF16.bit_width(), 16);
        assert_eq!(DType::F32.bit_width(), 32);
        assert_eq!(DType::I64.bit_width(), 64);
    }

    #[test]
    fn names_round_trip() {
        for dtype in DType::ALL {
            assert_eq!(DType::from_name(dtype.as_str()), Some(dtype));
        }
        assert_eq!(DType::from_name("complex64"), None);
    }

    #[test]
    fn integer_cast_wraps_to_width() {
        assert_eq!(DType::I8.cast_literal(Literal::I64(130)), Literal::I64(-126));
        assert_eq!(DType::U8.cast_literal(Literal::I64(-1)), Literal::I64(255));
        assert_eq!(DType::I32.cast_literal(Literal::from_f64(-2.9)), Literal::I64(-2));
    }

    #[test]
    fn float_cast_rounds_to_precision() {
        let third = DType::F32.cast_literal(Literal::from_f64(1.0 / 3.0));
        assert_eq!(third.as_f64(), Some(f64::from(1.0_f32 / 3.0)));

        let half_max = DType::F16.cast_literal(Literal::from_f64(70_000.0));
        assert_eq!(half_max.as_f64(), Some(f64::INFINITY));
    }

    #[test]
    fn bool_cast_tests_nonzero() {
        assert_eq!(DType::Bool.cast_literal(Literal::I64(3)), Literal::Bool(true));
        assert_eq!(
            DType::Bool.cast_literal(Literal::from_f64(0.0)),
            Literal::Bool(false)
        );
        assert_eq!(DType::F64.cast_literal(Literal::Bool(true)), Literal::from_f64(1.0));
    }

    #[test]
    fn promotion_lattice() {
        assert_eq!(promote_types(DType::Bool, DType::I8), DType::I8);
        assert_eq!(promote_types(DType::I16, DType::I64), DType::I64);
        assert_eq!(promote_types(DType::U8, DType::I8), DType::I16);
        assert_eq!(promote_types(DType::U8, DType::I32), DType::I32);
        assert_eq!(promote_types(DType::I64, DType::F16), DType::F16);
        assert_eq!(promote_types(DType::F16, DType::BF16), DType::F32);
        assert_eq!(promote_types(DType::F32, DType::F64), DType::F64);
    }

    #[test]
    fn promotion_is_symmetric() {
        for lhs in DType::ALL {
            for rhs in DType::ALL {
                assert_eq!(
                    promote_types(lhs, rhs),
                    promote_types(rhs, lhs),
                    "{lhs} vs {rhs}"
                );
            }
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(DType::U8.kind(), DTypeKind::Unsigned);
        assert!(DType::I32.is_integral());
        assert!(!DType::Bool.is_integral());
        assert!(DType::BF16.is_floating());
    }
}
