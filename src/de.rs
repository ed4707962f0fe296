//! Decoding.
//!
//! Decoding runs in three steps:
//!
//! 1. The [`Parser`] turns text into flat key-path entries.
//! 2. The walker follows a [`Descriptor`] over those entries and builds a
//!    [`CfgValue`]. Scalars go through the coercion rules. Destinations with
//!    no entry get the zero value of their kind.
//! 3. For serde types, [`ValueDeserializer`] feeds that value to `T`'s
//!    `Deserialize` impl.
//!
//! Structural findings stop decoding before the walk. Coercion failures and
//! entries that were never read (`Extra field (<path>) at line <n>`) are
//! collected during the walk and reported together afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_cfg::from_str;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Limits { max_conn: u32, ratio: f64 }
//!
//! let limits: Limits = from_str("max_conn = 2K\nratio = 0.75").unwrap();
//! assert_eq!(limits, Limits { max_conn: 2000, ratio: 0.75 });
//!
//! let err = from_str::<Limits>("max_conn = 1\nmax_cnn = 2").unwrap_err();
//! assert_eq!(err.to_string(), "Extra field (max_cnn) at line 2");
//! ```

use crate::coerce::{coerce, coerce_time};
use crate::descriptor::{Descriptor, Field};
use crate::error::{Diagnostic, Diagnostics, Error, Result};
use crate::grammar::{to_lower, to_snake_case};
use crate::map::CfgMap;
use crate::options::DecodeOptions;
use crate::parser::{Entries, IncludeResolver, ParseResult, Parser};
use crate::time::{Timestamp, TIMESTAMP_TOKEN};
use crate::value::{CfgValue, Number};
use indexmap::IndexSet;
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;
use tracing::{debug, warn};

fn check_root(descriptor: &Descriptor) -> Result<()> {
    if descriptor.is_container() {
        Ok(())
    } else {
        Err(Error::precondition("Expecting a struct or a map"))
    }
}

/// Decodes `source` into the shape described by `descriptor`.
///
/// `include` lines are recorded but not followed; use
/// [`decode_with_resolver`] to merge included documents.
pub fn decode(source: &str, descriptor: &Descriptor, options: &DecodeOptions) -> Result<CfgValue> {
    check_root(descriptor)?;
    let result = Parser::new(options.parse_options()).parse_str(source);
    if !result.includes.is_empty() {
        warn!(
            includes = result.includes.len(),
            "include directives are not followed without a resolver"
        );
    }
    decode_parsed(result, descriptor, options)
}

/// Decodes `source`, merging every included document through `resolver` first.
pub fn decode_with_resolver<I: IncludeResolver + ?Sized>(
    source: &str,
    descriptor: &Descriptor,
    options: &DecodeOptions,
    resolver: &mut I,
) -> Result<CfgValue> {
    check_root(descriptor)?;
    let parser = Parser::new(options.parse_options());
    let mut result = parser.parse_str(source);
    result.resolve_includes(&parser, resolver);
    decode_parsed(result, descriptor, options)
}

/// Walks an already parsed document. Fails with the parse findings if there are any.
pub fn decode_parsed(mut result: ParseResult, descriptor: &Descriptor, options: &DecodeOptions) -> Result<CfgValue> {
    check_root(descriptor)?;
    if let Some(err) = result.error() {
        return Err(err);
    }
    walk(&mut result.entries, descriptor, options)
}

/// Runs the structural walk over `entries`, marking each entry it reads as consumed.
pub fn walk(entries: &mut Entries, descriptor: &Descriptor, options: &DecodeOptions) -> Result<CfgValue> {
    check_root(descriptor)?;
    let mut walker = Walker {
        entries,
        options,
        diagnostics: Diagnostics::new(),
    };
    let value = walker.walk_node(descriptor, "");
    let Walker {
        entries,
        mut diagnostics,
        ..
    } = walker;
    for (path, entry) in entries.iter().filter(|(_, entry)| !entry.consumed) {
        diagnostics.push(Diagnostic::schema(format!("Extra field ({})", path), entry.line));
    }
    debug!(
        entries = entries.len(),
        findings = diagnostics.len(),
        "decoded document"
    );
    diagnostics.into_result()?;
    Ok(value)
}

struct Walker<'a> {
    entries: &'a mut Entries,
    options: &'a DecodeOptions,
    diagnostics: Diagnostics,
}

impl<'a> Walker<'a> {
    fn walk_node(&mut self, descriptor: &Descriptor, path: &str) -> CfgValue {
        match descriptor {
            Descriptor::Struct(fields) => self.walk_struct(fields, path),
            Descriptor::Map(element) => self.walk_map(element, path),
            Descriptor::Scalar(kind) => {
                let Some((raw, line)) = self.lookup(path) else {
                    return CfgValue::zero(*kind);
                };
                match coerce(&raw, *kind) {
                    Ok(Some(value)) => value,
                    Ok(None) => CfgValue::zero(*kind),
                    Err(err) => {
                        self.diagnostics.push(Diagnostic::coercion(err.to_string(), line));
                        CfgValue::zero(*kind)
                    }
                }
            }
            Descriptor::Time => {
                let Some((raw, line)) = self.lookup(path) else {
                    return CfgValue::Time(Timestamp::default());
                };
                coerce_time(&raw).unwrap_or_else(|err| {
                    self.diagnostics.push(Diagnostic::coercion(err.to_string(), line));
                    CfgValue::Time(Timestamp::default())
                })
            }
        }
    }

    fn walk_struct(&mut self, fields: &[Field], path: &str) -> CfgValue {
        let mut members = CfgMap::with_capacity(fields.len());
        for field in fields.iter().filter(|field| field.visible) {
            let child = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", path, field.name)
            };
            let value = self.walk_node(&field.descriptor, &child);
            members.insert(field.name.clone(), value);
        }
        CfgValue::Struct(members)
    }

    fn walk_map(&mut self, element: &Descriptor, path: &str) -> CfgValue {
        let mut members = CfgMap::new();
        let Some(prefix) = self.map_prefix(path) else {
            return CfgValue::Map(members);
        };
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();

        if element.is_container() {
            let segments: IndexSet<&str> = keys
                .iter()
                .filter_map(|key| key[prefix.len()..].split_once('.').map(|(segment, _)| segment))
                .collect();
            for segment in segments {
                let value = self.walk_node(element, &format!("{}{}", prefix, segment));
                members.insert(segment.to_string(), value);
            }
            return CfgValue::Map(members);
        }

        for key in &keys {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            entry.consumed = true;
            let (raw, line) = (entry.value.clone(), entry.line);
            let coerced = match element {
                Descriptor::Scalar(kind) => {
                    coerce(&raw, *kind).map(|value| value.unwrap_or_else(|| CfgValue::zero(*kind)))
                }
                _ => coerce_time(&raw),
            };
            match coerced {
                Ok(value) => {
                    members.insert(key[prefix.len()..].to_string(), value);
                }
                Err(err) => self.diagnostics.push(Diagnostic::coercion(err.to_string(), line)),
            }
        }
        CfgValue::Map(members)
    }

    /// Key-path spellings to try, in order.
    fn candidates(&self, path: &str) -> Vec<String> {
        let mut keys = vec![path.to_string()];
        if self.options.allow_snake_case {
            keys.push(to_snake_case(path));
        }
        if self.options.lowercase_lookup() {
            keys.push(to_lower(path));
        }
        keys
    }

    /// Finds the raw value for `path` and marks it consumed.
    fn lookup(&mut self, path: &str) -> Option<(String, usize)> {
        for key in self.candidates(path) {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.consumed = true;
                return Some((entry.value.clone(), entry.line));
            }
        }
        None
    }

    /// The `path.` prefix spelling that has entries under it. The root map takes every entry.
    fn map_prefix(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return Some(String::new());
        }
        self.candidates(path)
            .into_iter()
            .map(|candidate| format!("{}.", candidate))
            .find(|prefix| self.entries.keys().any(|key| key.starts_with(prefix.as_str())))
    }
}

/// Deserializes a `T` from a value tree.
pub struct ValueDeserializer {
    value: CfgValue,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: CfgValue) -> Self {
        ValueDeserializer { value }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            CfgValue::Bool(b) => visitor.visit_bool(b),
            CfgValue::Number(Number::Int(i)) => visitor.visit_i64(i),
            CfgValue::Number(Number::UInt(u)) => visitor.visit_u64(u),
            CfgValue::Number(Number::F32(f)) => visitor.visit_f32(f),
            CfgValue::Number(Number::F64(f)) => visitor.visit_f64(f),
            CfgValue::String(s) => visitor.visit_string(s),
            CfgValue::Time(t) => visitor.visit_string(t.to_string()),
            CfgValue::Struct(m) | CfgValue::Map(m) => visitor.visit_map(MapDeserializer::new(m)),
        }
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        if name == TIMESTAMP_TOKEN {
            return self.deserialize_any(visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, CfgValue>,
    value: Option<CfgValue>,
}

impl MapDeserializer {
    fn new(map: CfgMap) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}
