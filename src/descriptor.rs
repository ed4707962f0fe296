//! Type descriptors.
//!
//! A [`Descriptor`] is the closed shape the decoder walks: leaf scalars,
//! structs with ordered named fields, string-keyed maps, and time. The
//! descriptor for a Rust type is found by running its `Deserialize` impl
//! against a tracer that records which serde shape is requested at each
//! position and answers with a default value.
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_cfg::{Descriptor, ScalarKind};
//!
//! #[derive(Deserialize)]
//! struct Server {
//!     host: String,
//!     port: u16,
//! }
//!
//! let descriptor = Descriptor::of::<Server>().unwrap();
//! let fields = descriptor.fields().unwrap();
//! assert_eq!(fields[1].name, "port");
//! assert_eq!(fields[1].descriptor, Descriptor::Scalar(ScalarKind::U16));
//! ```
//!
//! Sequences, options, enums, tuples, unit types, byte buffers and 128-bit
//! integers have no textual form and are rejected while tracing.

use crate::error::{Error, Result};
use crate::time::TIMESTAMP_TOKEN;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, Visitor};
use serde::forward_to_deserialize_any;

/// Maximum struct/map nesting the tracer follows.
pub const MAX_TRACE_DEPTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
}

impl ScalarKind {
    /// Bit width for numeric kinds.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 8,
            ScalarKind::I16 | ScalarKind::U16 => 16,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 32,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 64,
            ScalarKind::Bool | ScalarKind::Char | ScalarKind::String => 0,
        }
    }
}

/// The shape of a destination value.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptor {
    Scalar(ScalarKind),
    Struct(Vec<Field>),
    /// String-keyed map with a homogeneous element shape.
    Map(Box<Descriptor>),
    Time,
}

/// A named struct member.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub descriptor: Descriptor,
    /// Invisible fields are skipped by the decoder and never read entries.
    pub visible: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Field {
            name: name.into(),
            descriptor,
            visible: true,
        }
    }

    pub fn hidden(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Field {
            visible: false,
            ..Field::new(name, descriptor)
        }
    }
}

impl Descriptor {
    /// Traces `T`'s `Deserialize` impl into a descriptor.
    pub fn of<T: DeserializeOwned>() -> Result<Descriptor> {
        let mut slot = None;
        T::deserialize(Tracer::new(String::new(), 0, &mut slot))?;
        slot.ok_or_else(|| Error::precondition("Type produced no descriptor"))
    }

    pub fn map_of(element: Descriptor) -> Descriptor {
        Descriptor::Map(Box::new(element))
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Descriptor::Struct(_) | Descriptor::Map(_))
    }

    #[must_use]
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Descriptor::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

struct Tracer<'a> {
    path: String,
    depth: usize,
    out: &'a mut Option<Descriptor>,
}

impl<'a> Tracer<'a> {
    fn new(path: String, depth: usize, out: &'a mut Option<Descriptor>) -> Self {
        Tracer { path, depth, out }
    }

    fn record(self, descriptor: Descriptor) {
        *self.out = Some(descriptor);
    }

    fn reject<T>(&self, kind: &str) -> Result<T> {
        Err(Error::type_not_allowed(kind, &self.path))
    }

    fn descend(&self) -> Result<usize> {
        if self.depth >= MAX_TRACE_DEPTH {
            return Err(Error::precondition("Maximum nesting depth exceeded"));
        }
        Ok(self.depth + 1)
    }
}

macro_rules! trace_scalar {
    ($($method:ident => $kind:ident, $visit:ident($default:expr);)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                self.record(Descriptor::Scalar(ScalarKind::$kind));
                visitor.$visit($default)
            }
        )*
    };
}

macro_rules! trace_rejected {
    ($($method:ident => $kind:expr;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
                self.reject($kind)
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for Tracer<'a> {
    type Error = Error;

    trace_scalar! {
        deserialize_bool => Bool, visit_bool(false);
        deserialize_i8 => I8, visit_i8(0);
        deserialize_i16 => I16, visit_i16(0);
        deserialize_i32 => I32, visit_i32(0);
        deserialize_i64 => I64, visit_i64(0);
        deserialize_u8 => U8, visit_u8(0);
        deserialize_u16 => U16, visit_u16(0);
        deserialize_u32 => U32, visit_u32(0);
        deserialize_u64 => U64, visit_u64(0);
        deserialize_f32 => F32, visit_f32(0.0);
        deserialize_f64 => F64, visit_f64(0.0);
        deserialize_char => Char, visit_char('\0');
        deserialize_str => String, visit_borrowed_str("");
        deserialize_string => String, visit_borrowed_str("");
    }

    trace_rejected! {
        deserialize_any => "any";
        deserialize_ignored_any => "any";
        deserialize_i128 => "i128";
        deserialize_u128 => "u128";
        deserialize_bytes => "bytes";
        deserialize_byte_buf => "bytes";
        deserialize_option => "option";
        deserialize_unit => "unit";
        deserialize_seq => "seq";
        deserialize_identifier => "identifier";
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(self, _name: &'static str, _visitor: V) -> Result<V::Value> {
        self.reject("unit")
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, name: &'static str, visitor: V) -> Result<V::Value> {
        if name == TIMESTAMP_TOKEN {
            self.record(Descriptor::Time);
            return visitor.visit_borrowed_str("0001-01-01");
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        self.reject("tuple")
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value> {
        self.reject("tuple")
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        self.reject("enum")
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let depth = self.descend()?;
        let mut access = MapTracer {
            path: &self.path,
            depth,
            element: None,
            done: false,
        };
        let value = visitor.visit_map(&mut access)?;
        let element = access
            .element
            .ok_or_else(|| Error::precondition("Map element produced no descriptor"))?;
        self.record(Descriptor::map_of(element));
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let depth = self.descend()?;
        let mut access = StructTracer {
            path: &self.path,
            depth,
            names: fields.iter(),
            current: None,
            fields: Vec::with_capacity(fields.len()),
        };
        let value = visitor.visit_map(&mut access)?;
        let fields = access.fields;
        self.record(Descriptor::Struct(fields));
        Ok(value)
    }
}

struct StructTracer<'p> {
    path: &'p str,
    depth: usize,
    names: std::slice::Iter<'static, &'static str>,
    current: Option<&'static str>,
    fields: Vec<Field>,
}

impl<'de, 'p> MapAccess<'de> for StructTracer<'p> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.names.next() {
            Some(&name) => {
                self.current = Some(name);
                seed.deserialize(name.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let name = self
            .current
            .take()
            .ok_or_else(|| Error::custom("value requested before key"))?;
        let mut slot = None;
        let value = seed.deserialize(Tracer::new(child_path(self.path, name), self.depth, &mut slot))?;
        let descriptor = slot.ok_or_else(|| Error::precondition("Field produced no descriptor"))?;
        self.fields.push(Field::new(name, descriptor));
        Ok(value)
    }
}

/// Presents exactly one entry so the element type is traced once.
struct MapTracer<'p> {
    path: &'p str,
    depth: usize,
    element: Option<Descriptor>,
    done: bool,
}

impl<'de, 'p> MapAccess<'de> for MapTracer<'p> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        seed.deserialize(KeyTracer).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(Tracer::new(self.path.to_string(), self.depth, &mut self.element))
    }
}

/// Accepts only string-like map keys.
struct KeyTracer;

impl<'de> de::Deserializer<'de> for KeyTracer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::precondition("Expecting map with string keys"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char
        bytes byte_buf option unit unit_struct seq tuple
        tuple_struct map struct enum ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use serde::Deserialize;
    use std::collections::{BTreeMap, HashMap};

    #[allow(dead_code)]
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Inner {
        level: i8,
        ratio: f32,
    }

    #[allow(dead_code)]
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Outer {
        name: String,
        enabled: bool,
        started: Timestamp,
        inner: Inner,
        limits: HashMap<String, u64>,
        nodes: BTreeMap<String, Inner>,
        #[serde(skip)]
        cache: u32,
    }

    #[test]
    fn test_trace_nested_struct() {
        let descriptor = Descriptor::of::<Outer>().unwrap();
        let inner = Descriptor::Struct(vec![
            Field::new("Level", Descriptor::Scalar(ScalarKind::I8)),
            Field::new("Ratio", Descriptor::Scalar(ScalarKind::F32)),
        ]);
        assert_eq!(
            descriptor,
            Descriptor::Struct(vec![
                Field::new("Name", Descriptor::Scalar(ScalarKind::String)),
                Field::new("Enabled", Descriptor::Scalar(ScalarKind::Bool)),
                Field::new("Started", Descriptor::Time),
                Field::new("Inner", inner.clone()),
                Field::new("Limits", Descriptor::map_of(Descriptor::Scalar(ScalarKind::U64))),
                Field::new("Nodes", Descriptor::map_of(inner)),
            ])
        );
    }

    #[test]
    fn test_char_is_its_own_kind() {
        #[allow(dead_code)]
        #[derive(Deserialize)]
        struct Sep {
            delim: char,
        }
        let descriptor = Descriptor::of::<Sep>().unwrap();
        assert_eq!(
            descriptor.fields().unwrap()[0].descriptor,
            Descriptor::Scalar(ScalarKind::Char)
        );
    }

    #[test]
    fn test_rejects_sequences_with_path() {
        #[allow(dead_code)]
        #[derive(Deserialize)]
        struct WithSeq {
            key1: Vec<String>,
        }
        let err = Descriptor::of::<WithSeq>().unwrap_err();
        assert_eq!(err.to_string(), "key1 type seq not allowed");
    }

    #[test]
    fn test_rejects_option_and_enum() {
        #[allow(dead_code)]
        #[derive(Deserialize)]
        enum Mode {
            Fast,
        }
        #[allow(dead_code)]
        #[derive(Deserialize)]
        struct WithOption {
            inner: WithEnum,
            maybe: Option<u8>,
        }
        #[allow(dead_code)]
        #[derive(Deserialize)]
        struct WithEnum {
            mode: Mode,
        }
        let err = Descriptor::of::<WithOption>().unwrap_err();
        assert_eq!(err.to_string(), "inner.mode type enum not allowed");
    }

    #[test]
    fn test_rejects_non_string_map_keys() {
        let err = Descriptor::of::<HashMap<u32, String>>().unwrap_err();
        assert_eq!(err.to_string(), "Expecting map with string keys");
    }

    #[test]
    fn test_recursive_types_hit_depth_limit() {
        #[allow(dead_code)]
        #[derive(Deserialize)]
        struct Node {
            children: HashMap<String, Node>,
        }
        let err = Descriptor::of::<Node>().unwrap_err();
        assert_eq!(err.to_string(), "Maximum nesting depth exceeded");
    }

    #[test]
    fn test_hidden_field() {
        let field = Field::hidden("Secret", Descriptor::Scalar(ScalarKind::String));
        assert!(!field.visible);
        assert_eq!(field.name, "Secret");
    }
}
