//! Literal values and the per-primitive decode table.
//!
//! [`decode`] is a single exhaustive `match` over [`PrimTag`]: a tag without a
//! decode rule does not compile.

use super::types::PrimTag;
use serde_json::Value;
use std::fmt;

/// IEEE 754 binary16 value, stored as raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Half(pub u16);

impl Half {
    /// Narrow an `f32` to binary16, rounding to nearest even.
    pub fn from_f32(value: f32) -> Half {
        let x = value.to_bits();
        let sign = ((x >> 16) & 0x8000) as u16;
        let exp = ((x >> 23) & 0xff) as i32;
        let man = x & 0x007f_ffff;

        if exp == 0xff {
            let nan = if man != 0 { 0x0200 } else { 0 };
            return Half(sign | 0x7c00 | nan);
        }

        let unbiased = exp - 127;
        if unbiased > 15 {
            return Half(sign | 0x7c00);
        }

        if unbiased >= -14 {
            let mut bits = (((unbiased + 15) as u32) << 10) | (man >> 13);
            let rest = man & 0x1fff;
            if rest > 0x1000 || (rest == 0x1000 && bits & 1 == 1) {
                // A carry out of the mantissa bumps the exponent, which is exactly right.
                bits += 1;
            }
            return Half(sign | bits as u16);
        }

        if unbiased < -25 {
            return Half(sign);
        }

        // Subnormal: value = m * 2^-24
        let full = man | 0x0080_0000;
        let shift = (-(unbiased + 1)) as u32;
        let mut bits = full >> shift;
        let rest = full & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        if rest > halfway || (rest == halfway && bits & 1 == 1) {
            bits += 1;
        }
        Half(sign | bits as u16)
    }

    /// Narrow an `f64` to binary16.
    pub fn from_f64(value: f64) -> Half {
        Half::from_f32(value as f32)
    }

    pub fn to_f64(self) -> f64 {
        let sign = if self.0 & 0x8000 != 0 { -1.0 } else { 1.0 };
        let exp = (self.0 >> 10) & 0x1f;
        let man = f64::from(self.0 & 0x03ff);
        match exp {
            0 => sign * man * 2f64.powi(-24),
            0x1f if man == 0.0 => sign * f64::INFINITY,
            0x1f => f64::NAN,
            _ => sign * (1.0 + man / 1024.0) * 2f64.powi(i32::from(exp) - 15),
        }
    }
}

/// A decoded scalar literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    F16(Half),
    F32(f32),
    F64(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::S8(v) => write!(f, "{}", v),
            Literal::S16(v) => write!(f, "{}", v),
            Literal::S32(v) => write!(f, "{}", v),
            Literal::S64(v) => write!(f, "{}", v),
            Literal::U8(v) => write!(f, "{}", v),
            Literal::U16(v) => write!(f, "{}", v),
            Literal::U32(v) => write!(f, "{}", v),
            Literal::U64(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::F16(v) => write!(f, "{}", v.to_f64()),
            Literal::F32(v) => write!(f, "{}", v),
            Literal::F64(v) => write!(f, "{}", v),
        }
    }
}

fn signed<T: TryFrom<i64>>(value: &Value) -> Result<T, String> {
    let v = value
        .as_i64()
        .ok_or_else(|| format!("expected a signed integer, found {}", value))?;
    T::try_from(v).map_err(|_| format!("{} is out of range", v))
}

fn unsigned<T: TryFrom<u64>>(value: &Value) -> Result<T, String> {
    let v = value
        .as_u64()
        .ok_or_else(|| format!("expected an unsigned integer, found {}", value))?;
    T::try_from(v).map_err(|_| format!("{} is out of range", v))
}

fn float(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, found {}", value))
}

/// Decode a JSON literal for the given primitive tag.
///
/// Integers decode at their exact width and fail when out of range; floats go
/// through `f64` and are then narrowed.
pub fn decode(tag: PrimTag, value: &Value) -> Result<Literal, String> {
    use PrimTag::*;
    Ok(match tag {
        Ps8 | Qs8 => Literal::S8(signed(value)?),
        Ps16 | Qs16 => Literal::S16(signed(value)?),
        Ps32 | Qs32 => Literal::S32(signed(value)?),
        Ps64 | Qs64 => Literal::S64(signed(value)?),
        Pu8 | Qu8 => Literal::U8(unsigned(value)?),
        Pu16 | Qu16 => Literal::U16(unsigned(value)?),
        Pu32 | Qu32 => Literal::U32(unsigned(value)?),
        Pu64 | Qu64 => Literal::U64(unsigned(value)?),
        Bool => Literal::Bool(
            value
                .as_bool()
                .ok_or_else(|| format!("expected a boolean, found {}", value))?,
        ),
        Pf16 | Qf16 => Literal::F16(Half::from_f64(float(value)?)),
        Pf32 | Qf32 => Literal::F32(float(value)? as f32),
        Pf64 | Qf64 => Literal::F64(float(value)?),
    })
}
