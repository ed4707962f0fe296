//! Typed value tree.
//!
//! [`CfgValue`] is what the decoder produces from text and what the encoder
//! renders back to text. Structs and maps are kept apart: struct members are
//! written in declaration order, map entries in sorted key order.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cfg::{to_value, CfgValue};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let value = to_value(&Point { x: 10, y: 20 }).unwrap();
//! let fields = value.as_struct().unwrap();
//! assert_eq!(fields.get("x").and_then(CfgValue::as_i64), Some(10));
//! ```

use crate::descriptor::ScalarKind;
use crate::map::CfgMap;
use crate::time::Timestamp;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum CfgValue {
    Bool(bool),
    Number(Number),
    String(String),
    Time(Timestamp),
    Struct(CfgMap),
    Map(CfgMap),
}

/// A numeric value, tagged with its signedness and float width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
}

impl Number {
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Number::Int(_) | Number::UInt(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::F32(_) | Number::F64(_))
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match *self {
            Number::Int(i) => i == 0,
            Number::UInt(u) => u == 0,
            Number::F32(f) => f == 0.0,
            Number::F64(f) => f == 0.0,
        }
    }

    /// Converts this number to an `i64` if it is an integer in range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::Number;
    ///
    /// assert_eq!(Number::Int(-4).as_i64(), Some(-4));
    /// assert_eq!(Number::UInt(u64::MAX).as_i64(), None);
    /// assert_eq!(Number::F64(1.0).as_i64(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int(i) => Some(i),
            Number::UInt(u) => i64::try_from(u).ok(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Number::Int(i) => u64::try_from(i).ok(),
            Number::UInt(u) => Some(u),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::F32(f) => f as f64,
            Number::F64(f) => f,
        }
    }
}

/// Shortest round-trip digits; exponent form when the decimal exponent is
/// below -4 or at least 21.
fn format_float<T: fmt::Display + fmt::LowerExp>(value: T) -> String {
    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    if (-4..21).contains(&exponent) {
        value.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::UInt(u) => write!(f, "{}", u),
            Number::F32(v) => f.write_str(&format_float(v)),
            Number::F64(v) => f.write_str(&format_float(v)),
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number::$variant(<$target>::from(value))
                }
            }

            impl From<$ty> for CfgValue {
                fn from(value: $ty) -> Self {
                    CfgValue::Number(Number::from(value))
                }
            }
        )*
    };
}

impl_from_number! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => F32 as f32,
    f64 => F64 as f64,
}

impl CfgValue {
    /// The value a destination of `kind` holds when no entry supplies one.
    #[must_use]
    pub fn zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => CfgValue::Bool(false),
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => {
                CfgValue::Number(Number::Int(0))
            }
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => {
                CfgValue::Number(Number::UInt(0))
            }
            ScalarKind::F32 => CfgValue::Number(Number::F32(0.0)),
            ScalarKind::F64 => CfgValue::Number(Number::F64(0.0)),
            ScalarKind::Char => CfgValue::String('\0'.to_string()),
            ScalarKind::String => CfgValue::String(String::new()),
        }
    }

    /// `true` for `false`, numeric zero, the empty string and the zero time.
    /// Containers are never zero themselves.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            CfgValue::Bool(b) => !b,
            CfgValue::Number(n) => n.is_zero(),
            CfgValue::String(s) => s.is_empty(),
            CfgValue::Time(t) => t.is_zero(),
            CfgValue::Struct(_) | CfgValue::Map(_) => false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, CfgValue::Struct(_) | CfgValue::Map(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CfgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CfgValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CfgValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CfgValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CfgValue::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_time(&self) -> Option<&Timestamp> {
        match self {
            CfgValue::Time(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_struct(&self) -> Option<&CfgMap> {
        match self {
            CfgValue::Struct(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&CfgMap> {
        match self {
            CfgValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a dotted path through nested structs and maps.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::{decode, DecodeOptions, Descriptor, Field, ScalarKind};
    ///
    /// let descriptor = Descriptor::Struct(vec![Field::new(
    ///     "Server",
    ///     Descriptor::Struct(vec![Field::new("Port", Descriptor::Scalar(ScalarKind::U16))]),
    /// )]);
    /// let value = decode("Server.Port = 8080", &descriptor, &DecodeOptions::new()).unwrap();
    /// assert_eq!(value.pointer("Server.Port").and_then(|v| v.as_u64()), Some(8080));
    /// ```
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<&CfgValue> {
        path.split('.').try_fold(self, |value, segment| match value {
            CfgValue::Struct(m) | CfgValue::Map(m) => m.get(segment),
            _ => None,
        })
    }
}

impl fmt::Display for CfgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgValue::Bool(true) => f.write_str("True"),
            CfgValue::Bool(false) => f.write_str("False"),
            CfgValue::Number(n) => write!(f, "{}", n),
            CfgValue::String(s) => f.write_str(s),
            CfgValue::Time(t) => write!(f, "{}", t),
            CfgValue::Struct(m) | CfgValue::Map(m) => write!(f, "{{{} members}}", m.len()),
        }
    }
}

impl From<bool> for CfgValue {
    fn from(value: bool) -> Self {
        CfgValue::Bool(value)
    }
}

impl From<String> for CfgValue {
    fn from(value: String) -> Self {
        CfgValue::String(value)
    }
}

impl From<&str> for CfgValue {
    fn from(value: &str) -> Self {
        CfgValue::String(value.to_string())
    }
}

impl From<Timestamp> for CfgValue {
    fn from(value: Timestamp) -> Self {
        CfgValue::Time(value)
    }
}

impl From<Number> for CfgValue {
    fn from(value: Number) -> Self {
        CfgValue::Number(value)
    }
}

impl TryFrom<CfgValue> for i64 {
    type Error = crate::Error;

    fn try_from(value: CfgValue) -> crate::Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| crate::Error::custom(format!("expected integer, found {:?}", value)))
    }
}

impl TryFrom<CfgValue> for String {
    type Error = crate::Error;

    fn try_from(value: CfgValue) -> crate::Result<Self> {
        match value {
            CfgValue::String(s) => Ok(s),
            other => Err(crate::Error::custom(format!("expected string, found {:?}", other))),
        }
    }
}

impl Serialize for CfgValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CfgValue::Bool(b) => serializer.serialize_bool(*b),
            CfgValue::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            CfgValue::Number(Number::UInt(u)) => serializer.serialize_u64(*u),
            CfgValue::Number(Number::F32(f)) => serializer.serialize_f32(*f),
            CfgValue::Number(Number::F64(f)) => serializer.serialize_f64(*f),
            CfgValue::String(s) => serializer.serialize_str(s),
            CfgValue::Time(t) => t.serialize(serializer),
            CfgValue::Struct(m) | CfgValue::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CfgValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CfgValueVisitor;

        impl<'de> Visitor<'de> for CfgValueVisitor {
            type Value = CfgValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, number, string or string-keyed map")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(CfgValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(CfgValue::Number(Number::Int(value)))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(CfgValue::Number(Number::UInt(value)))
            }

            fn visit_f32<E>(self, value: f32) -> Result<Self::Value, E> {
                Ok(CfgValue::Number(Number::F32(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(CfgValue::Number(Number::F64(value)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(CfgValue::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(CfgValue::String(value))
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut values = CfgMap::new();
                while let Some((key, value)) = access.next_entry::<String, CfgValue>()? {
                    values.insert(key, value);
                }
                Ok(CfgValue::Map(values))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Err(E::custom("unit values have no textual form"))
            }
        }

        deserializer.deserialize_any(CfgValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_display() {
        assert_eq!(Number::F64(1.7976931348623157e308).to_string(), "1.7976931348623157e+308");
        assert_eq!(Number::F32(3.4028235e38).to_string(), "3.4028235e+38");
        assert_eq!(Number::F64(0.00001).to_string(), "1e-05");
        assert_eq!(Number::F64(0.0001).to_string(), "0.0001");
        assert_eq!(Number::F64(1e20).to_string(), "100000000000000000000");
        assert_eq!(Number::F64(1e21).to_string(), "1e+21");
        assert_eq!(Number::F64(2200.0).to_string(), "2200");
        assert_eq!(Number::F32(0.1).to_string(), "0.1");
    }

    #[test]
    fn test_zero_values() {
        assert!(CfgValue::Bool(false).is_zero());
        assert!(CfgValue::zero(ScalarKind::U8).is_zero());
        assert!(CfgValue::zero(ScalarKind::F32).is_zero());
        assert!(CfgValue::from("").is_zero());
        assert!(CfgValue::Time(Timestamp::default()).is_zero());
        assert!(!CfgValue::Struct(CfgMap::new()).is_zero());
        assert!(!CfgValue::from(-1).is_zero());
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(CfgValue::from(42u16), CfgValue::Number(Number::UInt(42)));
        assert_eq!(CfgValue::from(-42i8), CfgValue::Number(Number::Int(-42)));
        assert_eq!(CfgValue::from(0.5f32), CfgValue::Number(Number::F32(0.5)));
        assert_eq!(CfgValue::from(true), CfgValue::Bool(true));
    }

    #[test]
    fn test_tryfrom() {
        assert_eq!(i64::try_from(CfgValue::from(7u8)).unwrap(), 7);
        assert!(i64::try_from(CfgValue::from("7")).is_err());
        assert_eq!(String::try_from(CfgValue::from("x")).unwrap(), "x");
    }

    #[test]
    fn test_pointer_walks_nested_values() {
        let mut inner = CfgMap::new();
        inner.insert("Port".to_string(), CfgValue::from(80u16));
        let mut outer = CfgMap::new();
        outer.insert("Server".to_string(), CfgValue::Struct(inner));
        let value = CfgValue::Struct(outer);
        assert_eq!(value.pointer("Server.Port").and_then(CfgValue::as_u64), Some(80));
        assert!(value.pointer("Server.Host").is_none());
    }

    #[test]
    fn test_serialize_with_serde_json() {
        let mut map = CfgMap::new();
        map.insert("a".to_string(), CfgValue::from(1));
        map.insert("b".to_string(), CfgValue::from("two"));
        let json = serde_json::to_string(&CfgValue::Map(map)).unwrap();
        assert_eq!(json, r#"{"a":1,"b":"two"}"#);

        let back: CfgValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pointer("b").and_then(CfgValue::as_str), Some("two"));
    }
}
