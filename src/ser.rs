//! Encoding.
//!
//! A serializable value is first converted into a [`CfgValue`] tree by
//! [`ValueSerializer`]. The renderer then writes that tree as text:
//!
//! - struct fields in declaration order, map entries sorted by key
//! - `key = value` lines, nested containers as `key = {` ... `}` blocks
//!   indented two spaces per level
//! - zero values (`0`, `false`, `""`, the zero time) are left out unless
//!   [`EncodeOptions::emit_zero_values`] is set. A container with nothing
//!   left to write emits no block at all
//! - long strings with several line breaks become heredocs. Other long
//!   strings are wrapped with trailing-backslash continuation lines
//!
//! ## Usage
//!
//! ```rust
//! use serde::Serialize;
//! use serde_cfg::to_string;
//!
//! #[derive(Serialize)]
//! struct Simple { S: String, I: i32 }
//!
//! #[derive(Serialize)]
//! struct Doc { Simple: Simple, Debug: bool }
//!
//! let doc = Doc { Simple: Simple { S: "String1".into(), I: 41 }, Debug: true };
//! assert_eq!(
//!     to_string(&doc).unwrap(),
//!     "Simple = {\n  S = String1\n  I = 41\n}\nDebug = True\n"
//! );
//! ```

use crate::error::{Error, Result};
use crate::grammar::{is_block_key, is_entry_key, quote_ascii, to_lower, to_snake_case, trim, trim_end};
use crate::map::CfgMap;
use crate::options::EncodeOptions;
use crate::time::{Timestamp, TIMESTAMP_TOKEN};
use crate::value::{CfgValue, Number};
use chrono::Utc;
use serde::{ser, Serialize};
use std::io;
use tracing::debug;

/// Strings at most this long are always written on one line.
const SHORT_STRING: usize = 50;
/// Longer strings with more line breaks than this become heredocs.
const HEREDOC_LINE_BREAKS: usize = 3;
const LINE_WIDTH: usize = 80;

/// Converts a `T: Serialize` into a [`CfgValue`].
///
/// ```rust
/// use serde_cfg::{to_value, CfgValue};
/// use std::collections::BTreeMap;
///
/// let mut ports = BTreeMap::new();
/// ports.insert("http", 80u16);
/// let value = to_value(&ports).unwrap();
/// assert_eq!(value.pointer("http").and_then(CfgValue::as_u64), Some(80));
///
/// assert!(to_value(&vec![1, 2]).is_err());
/// ```
pub fn to_value<T>(value: &T) -> Result<CfgValue>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Renders a value tree. The root must be a struct or a map.
pub fn encode(value: &CfgValue, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    encode_to_writer(value, options, &mut out)?;
    Ok(out)
}

/// Renders a value tree into `writer`.
///
/// Write failures do not stop the traversal; the first one is returned
/// after the whole tree has been visited.
pub fn encode_to_writer<W: io::Write>(value: &CfgValue, options: &EncodeOptions, writer: W) -> Result<()> {
    if !value.is_container() {
        return Err(Error::precondition("Expecting a struct or a map"));
    }
    let mut renderer = Renderer {
        writer,
        options,
        written: 0,
        failure: None,
    };
    renderer.render_members(value, 0)?;
    debug!(bytes = renderer.written, "encoded document");
    match renderer.failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

struct Renderer<'a, W> {
    writer: W,
    options: &'a EncodeOptions,
    written: usize,
    failure: Option<io::Error>,
}

impl<'a, W: io::Write> Renderer<'a, W> {
    fn write(&mut self, text: &str) {
        if self.failure.is_some() {
            return;
        }
        match self.writer.write_all(text.as_bytes()) {
            Ok(()) => self.written += text.len(),
            Err(err) => self.failure = Some(err),
        }
    }

    fn render_members(&mut self, container: &CfgValue, depth: usize) -> Result<()> {
        match container {
            CfgValue::Struct(members) => {
                for (key, value) in members.iter() {
                    self.render_entry(key, value, depth)?;
                }
            }
            CfgValue::Map(members) => {
                for (key, value) in members.sorted_iter() {
                    self.render_entry(key, value, depth)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn has_output(&self, value: &CfgValue) -> bool {
        match value {
            CfgValue::Struct(members) | CfgValue::Map(members) => {
                members.values().any(|member| self.has_output(member))
            }
            scalar => self.options.emit_zero_values || !scalar.is_zero(),
        }
    }

    fn key_text(&self, key: &str) -> String {
        let mut key = key.to_string();
        if self.options.snake_case_keys {
            key = to_snake_case(&key);
        }
        if self.options.lowercase_keys {
            key = to_lower(&key);
        }
        key
    }

    fn render_entry(&mut self, key: &str, value: &CfgValue, depth: usize) -> Result<()> {
        if !self.has_output(value) {
            return Ok(());
        }
        let key = self.key_text(key);
        let writable = if value.is_container() {
            is_block_key(&key)
        } else {
            is_entry_key(&key)
        };
        if !writable {
            return Err(Error::precondition(&format!("Cannot encode key ({})", key)));
        }
        let indent = "  ".repeat(depth);
        let text = match value {
            CfgValue::Struct(_) | CfgValue::Map(_) => {
                self.write(&format!("{}{} = {{\n", indent, key));
                self.render_members(value, depth + 1)?;
                self.write(&format!("{}}}\n", indent));
                return Ok(());
            }
            CfgValue::Bool(true) => "True".to_string(),
            CfgValue::Bool(false) => "False".to_string(),
            CfgValue::Number(n) => n.to_string(),
            CfgValue::Time(t) => t.to_string(),
            CfgValue::String(s) => {
                if s.chars().count() <= SHORT_STRING {
                    quote(s)
                } else if s.matches('\n').count() > HEREDOC_LINE_BREAKS && heredoc_safe(s) {
                    heredoc(s)
                } else {
                    wrap(s, indent.len() + key.len() + 3)
                }
            }
        };
        self.write(&format!("{}{} = {}\n", indent, key, text));
        Ok(())
    }
}

/// Writes `s` bare when it reads back unchanged, quoted otherwise.
fn quote(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    let quoted = quote_ascii(s);
    let bare = &quoted[1..quoted.len() - 1] == s
        && trim(s) == s
        && !s.starts_with('{')
        && !s.starts_with("<<");
    if bare {
        s.to_string()
    } else {
        quoted
    }
}

/// Heredoc lines lose trailing whitespace when read back, and a body wrapped
/// in quotes would be unquoted.
fn heredoc_safe(s: &str) -> bool {
    let wrapped = s.len() >= 2 && s.starts_with('"') && s.ends_with('"');
    !wrapped && s.split('\n').all(|line| trim_end(line) == line)
}

fn heredoc(s: &str) -> String {
    heredoc_with_base(s, &format!("__{:X}__", Utc::now().timestamp()))
}

/// `base` gets a `_N` suffix while a body line equals it.
fn heredoc_with_base(s: &str, base: &str) -> String {
    let clashes = |token: &str| s.split('\n').any(|line| trim(line) == token);
    let mut token = base.to_string();
    let mut suffix = 0;
    while clashes(&token) {
        suffix += 1;
        token = format!("{}_{}", base, suffix);
    }
    format!("<<{}\n{}\n{}", token, s.replace('\\', "\\\\"), token)
}

/// Splits `s` into quoted segments chained with trailing backslashes.
/// `offset` is the column where the value starts.
fn wrap(s: &str, offset: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let width = LINE_WIDTH.saturating_sub(offset).max(1);
    let mut segments = Vec::new();
    let mut start = 0;
    while chars.len() - start > width {
        let window = &chars[start..start + width];
        let end = match window.iter().rposition(|&c| c == ' ') {
            Some(space) => {
                let after = start + space + 1;
                chars[after..]
                    .iter()
                    .position(|&c| c == ' ')
                    .map_or(chars.len(), |next| after + next)
            }
            None => start + width,
        };
        segments.push(chars[start..end].iter().collect::<String>());
        start = end;
    }
    if start < chars.len() {
        segments.push(chars[start..].iter().collect::<String>());
    }
    let separator = format!("\\\n{}", " ".repeat(offset));
    segments
        .iter()
        .map(|segment| quote(segment))
        .collect::<Vec<_>>()
        .join(&separator)
}

/// Serializer whose output is a [`CfgValue`].
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = CfgValue;
    type Error = Error;

    type SerializeSeq = ser::Impossible<CfgValue, Error>;
    type SerializeTuple = ser::Impossible<CfgValue, Error>;
    type SerializeTupleStruct = ser::Impossible<CfgValue, Error>;
    type SerializeTupleVariant = ser::Impossible<CfgValue, Error>;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeStruct;
    type SerializeStructVariant = ser::Impossible<CfgValue, Error>;

    fn serialize_bool(self, v: bool) -> Result<CfgValue> {
        Ok(CfgValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<CfgValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<CfgValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<CfgValue> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<CfgValue> {
        Ok(CfgValue::Number(Number::Int(v)))
    }

    fn serialize_i128(self, _v: i128) -> Result<CfgValue> {
        Err(Error::unsupported("i128"))
    }

    fn serialize_u8(self, v: u8) -> Result<CfgValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<CfgValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<CfgValue> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<CfgValue> {
        Ok(CfgValue::Number(Number::UInt(v)))
    }

    fn serialize_u128(self, _v: u128) -> Result<CfgValue> {
        Err(Error::unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<CfgValue> {
        Ok(CfgValue::Number(Number::F32(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<CfgValue> {
        Ok(CfgValue::Number(Number::F64(v)))
    }

    fn serialize_char(self, v: char) -> Result<CfgValue> {
        if v == '\0' {
            return Ok(CfgValue::String(String::new()));
        }
        Ok(CfgValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<CfgValue> {
        Ok(CfgValue::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<CfgValue> {
        Err(Error::unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<CfgValue> {
        Err(Error::unsupported("option"))
    }

    fn serialize_some<T>(self, _value: &T) -> Result<CfgValue>
    where
        T: ?Sized + Serialize,
    {
        Err(Error::unsupported("option"))
    }

    fn serialize_unit(self) -> Result<CfgValue> {
        Err(Error::unsupported("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<CfgValue> {
        Err(Error::unsupported("unit"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<CfgValue> {
        Err(Error::unsupported("enum"))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<CfgValue>
    where
        T: ?Sized + Serialize,
    {
        if name != TIMESTAMP_TOKEN {
            return value.serialize(self);
        }
        match value.serialize(self)? {
            CfgValue::String(s) => Timestamp::parse(&s).map(CfgValue::Time).map_err(Error::custom),
            other => Err(Error::custom(format!("expected timestamp text, found {:?}", other))),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<CfgValue>
    where
        T: ?Sized + Serialize,
    {
        Err(Error::unsupported("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Error::unsupported("seq"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(Error::unsupported("tuple"))
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Err(Error::unsupported("tuple"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::unsupported("enum"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            map: CfgMap::with_capacity(len.unwrap_or(0)),
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeStruct> {
        Ok(SerializeStruct {
            fields: CfgMap::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::unsupported("enum"))
    }
}

pub struct SerializeMap {
    map: CfgMap,
    current_key: Option<String>,
}

pub struct SerializeStruct {
    fields: CfgMap,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = CfgValue;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match to_value(key) {
            Ok(CfgValue::String(s)) => {
                self.current_key = Some(s);
                Ok(())
            }
            _ => Err(Error::precondition("Expecting map with string keys")),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<CfgValue> {
        Ok(CfgValue::Map(self.map))
    }
}

impl ser::SerializeStruct for SerializeStruct {
    type Ok = CfgValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.fields.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<CfgValue> {
        Ok(CfgValue::Struct(self.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn render(value: &CfgValue) -> String {
        render_with(value, &EncodeOptions::default())
    }

    fn render_with(value: &CfgValue, options: &EncodeOptions) -> String {
        String::from_utf8(encode(value, options).unwrap()).unwrap()
    }

    fn doc(pairs: Vec<(&str, CfgValue)>) -> CfgValue {
        CfgValue::Struct(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn test_nested_block() {
        let value = doc(vec![(
            "Simple",
            doc(vec![("S", CfgValue::from("String1")), ("I", CfgValue::from(41i32))]),
        )]);
        assert_eq!(render(&value), "Simple = {\n  S = String1\n  I = 41\n}\n");
    }

    #[test]
    fn test_scalar_tokens() {
        let value = doc(vec![
            ("On", CfgValue::Bool(true)),
            ("Float32", CfgValue::from(f32::MAX)),
            ("Float64", CfgValue::from(f64::MAX)),
            ("Neg", CfgValue::from(-7i64)),
        ]);
        assert_eq!(
            render(&value),
            "On = True\nFloat32 = 3.4028235e+38\nFloat64 = 1.7976931348623157e+308\nNeg = -7\n"
        );
    }

    #[test]
    fn test_zero_values_suppressed_by_default() {
        let value = doc(vec![
            ("Off", CfgValue::Bool(false)),
            ("Count", CfgValue::from(0u32)),
            ("Name", CfgValue::from("")),
            ("When", CfgValue::Time(Timestamp::default())),
            ("Empty", doc(vec![("Inner", CfgValue::from(0i32))])),
        ]);
        assert_eq!(render(&value), "");

        let options = EncodeOptions::new().with_emit_zero_values(true);
        assert_eq!(
            render_with(&value, &options),
            "Off = False\nCount = 0\nName = \"\"\nWhen = 0001-01-01\nEmpty = {\n  Inner = 0\n}\n"
        );
    }

    #[test]
    fn test_map_keys_sorted() {
        let map: CfgMap = vec![
            ("zeta".to_string(), CfgValue::from(1i32)),
            ("alpha".to_string(), CfgValue::from(2i32)),
        ]
        .into_iter()
        .collect();
        let value = doc(vec![("Ports", CfgValue::Map(map))]);
        assert_eq!(render(&value), "Ports = {\n  alpha = 2\n  zeta = 1\n}\n");
    }

    #[test]
    fn test_key_transforms() {
        let value = doc(vec![("CrewMembers", CfgValue::from(4i32))]);
        let snake = EncodeOptions::new().with_snake_case_keys(true);
        assert_eq!(render_with(&value, &snake), "crew_members = 4\n");
        let lower = EncodeOptions::new().with_lowercase_keys(true);
        assert_eq!(render_with(&value, &lower), "crewmembers = 4\n");
    }

    #[test]
    fn test_quote_rules() {
        assert_eq!(quote("plain words"), "plain words");
        assert_eq!(quote(" padded"), "\" padded\"");
        assert_eq!(quote("tab\there"), "\"tab\\there\"");
        assert_eq!(quote("a#b"), "\"a\\x23b\"");
        assert_eq!(quote("{x"), "\"{x\"");
        assert_eq!(quote("<<EOF"), "\"<<EOF\"");
        assert_eq!(quote("ends\\"), "\"ends\\\\\"");
        assert_eq!(quote("caf\u{e9}"), "\"caf\\u00e9\"");
    }

    #[test]
    fn test_long_string_wraps() {
        let value = doc(vec![(
            "MultiLine1",
            CfgValue::from("We need to break this really long string at just the right spot (for extra coverage)"),
        )]);
        assert_eq!(
            render(&value),
            "MultiLine1 = We need to break this really long string at just the right spot (for\\\n             \" extra coverage)\"\n"
        );
    }

    #[test]
    fn test_wrap_hard_breaks_words() {
        let long = "x".repeat(150);
        let wrapped = wrap(&long, 10);
        let lines: Vec<&str> = wrapped.split("\\\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 70);
        assert_eq!(lines.concat().replace(' ', "").len(), 150);
    }

    #[test]
    fn test_heredoc_for_many_lines() {
        let body = "line one\n  line two\nline three\nline four\nline \\five and a little more";
        let value = doc(vec![("Text", CfgValue::from(body))]);
        let out = render(&value);
        let first = out.lines().next().unwrap();
        let token = first.trim_start_matches("Text = <<");
        assert!(token.starts_with("__") && token.ends_with("__"));
        assert!(out.contains("  line two\n"));
        assert!(out.contains("line \\\\five\n"));
        assert!(out.ends_with(&format!("\n{}\n", token)));
    }

    #[test]
    fn test_heredoc_token_avoids_body_lines() {
        let body = "start\n__BASE__\n__BASE___1 \nmiddle\nend";
        let text = heredoc_with_base(body, "__BASE__");
        assert!(text.starts_with("<<__BASE___2\n"));
        assert!(text.ends_with("\n__BASE___2"));

        let untouched = heredoc_with_base("a\nb", "__BASE__");
        assert_eq!(untouched, "<<__BASE__\na\nb\n__BASE__");

        let document = format!("Text = {}\n", heredoc_with_base("one\n__BASE__\nthree", "__BASE__"));
        let entries = Parser::default().parse_str(&document).into_result().unwrap();
        assert_eq!(entries["Text"].value, "one\n__BASE__\nthree");
    }

    #[test]
    fn test_keys_that_cannot_be_read_back_are_rejected() {
        let nested = doc(vec![(
            "M",
            CfgValue::Map(
                vec![("a.b".to_string(), doc(vec![("P", CfgValue::from(1i32))]))]
                    .into_iter()
                    .collect(),
            ),
        )]);
        let err = encode(&nested, &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot encode key (a.b)");

        for key in ["has space", ".lead", "a..b", "_", "caf\u{e9}"] {
            let value = doc(vec![(key, CfgValue::from(1i32))]);
            assert!(encode(&value, &EncodeOptions::default()).is_err(), "key {:?}", key);
        }

        let dotted = doc(vec![("a.b", CfgValue::from(1i32))]);
        assert_eq!(render(&dotted), "a.b = 1\n");
    }

    #[test]
    fn test_heredoc_unsafe_body_wraps() {
        let body = "line one   \nline two\nline three\nline four\nline five and more";
        assert!(!heredoc_safe(body));
        let value = doc(vec![("Text", CfgValue::from(body))]);
        assert!(!render(&value).contains("<<"));
    }

    #[test]
    fn test_root_must_be_container() {
        let err = encode(&CfgValue::from(1i32), &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Expecting a struct or a map");
    }

    #[test]
    fn test_unsupported_kinds() {
        assert_eq!(to_value(&vec![1]).unwrap_err().to_string(), "Cannot encode type (seq)");
        assert_eq!(to_value(&Some(1)).unwrap_err().to_string(), "Cannot encode type (option)");
        assert_eq!(to_value(&(1, 2)).unwrap_err().to_string(), "Cannot encode type (tuple)");

        let mut keyed = std::collections::BTreeMap::new();
        keyed.insert(1, "one");
        assert_eq!(to_value(&keyed).unwrap_err().to_string(), "Expecting map with string keys");
    }

    #[test]
    fn test_sink_failure_reported_once() {
        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let value = doc(vec![("A", CfgValue::from(1i32)), ("B", CfgValue::from(2i32))]);
        let err = encode_to_writer(&value, &EncodeOptions::default(), Broken).unwrap_err();
        assert_eq!(err.to_string(), "IO error: disk full");
    }
}
