//! Value coercion.
//!
//! Converts unescaped raw strings into scalar kinds.
//!
//! - Integers accept grouping commas and a trailing magnitude letter
//!   (`K M G T P E`) that stands for 3 to 18 zeros: `1K` is `1000`, `2,048M`
//!   is `2048000000`. The zeros are appended before parsing, so `1.5K` is not
//!   an integer.
//! - Floats accept the same letters as multipliers: `2.2K` is `2200.0`.
//! - Booleans accept `true yes on 1` and `false no off 0` in any case.
//! - Chars take exactly one character. An empty value is `'\0'`.
//! - Times are handled by [`Timestamp::parse`].

use crate::descriptor::ScalarKind;
use crate::error::CoercionError;
use crate::time::Timestamp;
use crate::value::{CfgValue, Number};
use std::num::IntErrorKind;
use tracing::warn;

fn magnitude_zeros(letter: char) -> Option<usize> {
    match letter {
        'K' => Some(3),
        'M' => Some(6),
        'G' => Some(9),
        'T' => Some(12),
        'P' => Some(15),
        'E' => Some(18),
        _ => None,
    }
}

fn strip_grouping(raw: &str) -> String {
    raw.chars().filter(|&c| c != ',').collect()
}

/// Removes grouping commas and expands a trailing magnitude letter into zeros.
fn expand_integer(raw: &str) -> String {
    if raw.len() < 2 {
        return raw.to_string();
    }
    let mut digits = strip_grouping(raw);
    if let Some(zeros) = digits.chars().last().and_then(magnitude_zeros) {
        digits.pop();
        digits.extend(std::iter::repeat('0').take(zeros));
    }
    digits
}

fn parse_wide(raw: &str) -> Result<i128, CoercionError> {
    expand_integer(raw).parse::<i128>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CoercionError::Overflow,
        _ => CoercionError::InvalidNumber {
            input: raw.to_string(),
        },
    })
}

/// Parses a signed integer that must fit in `bits` bits.
pub fn parse_signed(raw: &str, bits: u32) -> Result<i64, CoercionError> {
    let value = parse_wide(raw)?;
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    if value < min || value > max {
        return Err(CoercionError::Overflow);
    }
    i64::try_from(value).map_err(|_| CoercionError::Overflow)
}

/// Parses an unsigned integer that must fit in `bits` bits. Negative values overflow.
pub fn parse_unsigned(raw: &str, bits: u32) -> Result<u64, CoercionError> {
    let value = parse_wide(raw)?;
    let max = (1i128 << bits) - 1;
    if value < 0 || value > max {
        return Err(CoercionError::Overflow);
    }
    u64::try_from(value).map_err(|_| CoercionError::Overflow)
}

fn parse_plain_float(s: &str, input: &str) -> Result<f64, CoercionError> {
    s.parse::<f64>().map_err(|_| CoercionError::InvalidNumber {
        input: input.to_string(),
    })
}

/// Parses a float for a 32- or 64-bit destination.
pub fn parse_float(raw: &str, bits: u32) -> Result<f64, CoercionError> {
    let value = match raw.chars().count() {
        0 => return Ok(0.0),
        1 => parse_plain_float(raw, raw)?,
        _ => {
            let s = strip_grouping(raw);
            match s.chars().last() {
                Some(last) if !last.is_ascii_digit() => {
                    let prefix = &s[..s.len() - last.len_utf8()];
                    let base = parse_plain_float(prefix, raw)?;
                    let zeros = magnitude_zeros(last).ok_or(CoercionError::InvalidAbbreviation)?;
                    base * 10f64.powi(zeros as i32)
                }
                _ => parse_plain_float(&s, raw)?,
            }
        }
    };
    if value.is_infinite() || (bits == 32 && (value as f32).is_infinite()) {
        return Err(CoercionError::Overflow);
    }
    Ok(value)
}

/// `None` for tokens that are neither true nor false.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub fn parse_char(raw: &str) -> Result<char, CoercionError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok('\0'),
        (Some(c), None) => Ok(c),
        _ => Err(CoercionError::InvalidChar),
    }
}

/// Coerces `raw` into `kind`.
///
/// Returns `Ok(None)` when the destination keeps its default, which happens
/// only for unrecognized boolean tokens.
pub fn coerce(raw: &str, kind: ScalarKind) -> Result<Option<CfgValue>, CoercionError> {
    let number = match kind {
        ScalarKind::String => return Ok(Some(CfgValue::String(raw.to_string()))),
        ScalarKind::Char => return parse_char(raw).map(|c| Some(CfgValue::String(c.to_string()))),
        ScalarKind::Bool => {
            let value = parse_bool(raw);
            if value.is_none() {
                warn!(token = raw, "unrecognized boolean token, keeping default");
            }
            return Ok(value.map(CfgValue::Bool));
        }
        ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => {
            Number::Int(parse_signed(raw, kind.bits())?)
        }
        ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => {
            Number::UInt(parse_unsigned(raw, kind.bits())?)
        }
        ScalarKind::F32 => Number::F32(parse_float(raw, 32)? as f32),
        ScalarKind::F64 => Number::F64(parse_float(raw, 64)?),
    };
    Ok(Some(CfgValue::Number(number)))
}

pub fn coerce_time(raw: &str) -> Result<CfgValue, CoercionError> {
    Timestamp::parse(raw).map(CfgValue::Time)
}
