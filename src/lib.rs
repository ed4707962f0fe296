//! # serde_cfg
//!
//! A Serde-compatible codec for a line-oriented, human-editable
//! configuration format.
//!
//! ## The format
//!
//! ```text
//! # comments run to the end of the line
//! Name = primary
//! Server {
//!   Host = example.org
//!   Port = 8080
//! }
//! Server.Timeout = 30              # same namespace as the block above
//! Buffer: 64K                      # magnitude letters K M G T P E
//! Motd = <<EOF
//! Welcome to
//!   the machine
//! EOF
//! include "local.cfg"
//! ```
//!
//! A document parses into a flat map of dotted key paths. Decoding then
//! walks the destination type and picks the entries it needs, coercing each
//! raw string into the destination's scalar kind. Entries nothing asked for
//! are reported as extra fields, so typos do not pass silently.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_cfg::{from_str, to_string};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Server {
//!     Host: String,
//!     Port: u16,
//! }
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Config {
//!     Name: String,
//!     Server: Server,
//!     Verbose: bool,
//! }
//!
//! let config: Config = from_str(
//!     "Name = primary\nVerbose = yes\nServer {\n  Host = example.org\n  Port = 8080\n}\n",
//! )
//! .unwrap();
//! assert_eq!(config.Server.Port, 8080);
//! assert!(config.Verbose);
//!
//! let text = to_string(&config).unwrap();
//! assert_eq!(
//!     text,
//!     "Name = primary\nServer = {\n  Host = example.org\n  Port = 8080\n}\nVerbose = True\n"
//! );
//! let back: Config = from_str(&text).unwrap();
//! assert_eq!(back, config);
//! ```
//!
//! ## Supported types
//!
//! Destinations are structs and string-keyed maps whose leaves are `bool`,
//! integers up to 64 bits, `f32`, `f64`, `char`, `String` and [`Timestamp`].
//! Sequences, tuples, options, enums and unit types are rejected before any
//! input is read:
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug)]
//! struct Tagged { Tags: Vec<String> }
//!
//! let err = serde_cfg::from_str::<Tagged>("Tags = a").unwrap_err();
//! assert_eq!(err.to_string(), "Tags type seq not allowed");
//! ```
//!
//! Missing entries decode to the zero value of their kind.
//!
//! ## Errors
//!
//! Findings about the document are collected in full and reported together,
//! one per line:
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug)]
//! struct Limits { Small: i8 }
//!
//! let err = serde_cfg::from_str::<Limits>("Small = 128\nLarge = 1\n").unwrap_err();
//! assert_eq!(err.to_string(), "Overflow at line 1\nExtra field (Large) at line 2");
//! ```
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - decode and encode a typed configuration
//! - **`includes.rs`** - merging included documents through a resolver
//! - **`dynamic_values.rs`** - hand-built descriptors and [`CfgValue`] trees
//!
//! Run any example with: `cargo run --example <name>`

pub mod coerce;
pub mod de;
pub mod descriptor;
pub mod error;
mod grammar;
pub mod map;
pub mod options;
pub mod parser;
pub mod scanner;
pub mod ser;
pub mod time;
pub mod value;

pub use de::{decode, decode_with_resolver, ValueDeserializer};
pub use descriptor::{Descriptor, Field, ScalarKind};
pub use error::{CoercionError, Diagnostic, DiagnosticKind, Diagnostics, Error, Result};
pub use map::CfgMap;
pub use options::{DecodeOptions, EncodeOptions, ParseOptions};
pub use parser::{Entries, FileResolver, IncludeResolver, ParseResult, Parser, RawEntry, StringMap};
pub use ser::{encode, to_value, ValueSerializer};
pub use time::Timestamp;
pub use value::{CfgValue, Number};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Parses text into a flat map of key paths to unescaped values.
///
/// `include` lines are not followed here; use [`Parser`] with
/// [`ParseResult::resolve_includes`] or [`parse_file`] for that.
///
/// # Examples
///
/// ```rust
/// let map = serde_cfg::parse_str("A = 1\nB {\n  C = \"two\"\n}\n").unwrap();
/// assert_eq!(map["A"], "1");
/// assert_eq!(map["B.C"], "two");
/// ```
///
/// # Errors
///
/// Returns every structural finding, one per line.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_str(s: &str) -> Result<StringMap> {
    parse_with_options(s, &ParseOptions::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_with_options(s: &str, options: &ParseOptions) -> Result<StringMap> {
    string_map(Parser::new(options.clone()).parse_str(s))
}

/// Parses bytes into a flat map of key paths to unescaped values.
///
/// # Errors
///
/// Returns every structural finding, one per line.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_slice(v: &[u8]) -> Result<StringMap> {
    string_map(Parser::default().parse_slice(v))
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_reader<R: io::Read>(reader: R) -> Result<StringMap> {
    string_map(Parser::default().parse(io::BufReader::new(reader)))
}

/// Parses a file, merging its includes (read relative to the working directory).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, otherwise every
/// finding of the file and its includes.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<StringMap> {
    string_map(Parser::new(options.clone()).parse_file(path)?)
}

fn string_map(result: ParseResult) -> Result<StringMap> {
    match result.error() {
        Some(err) => Err(err),
        None => Ok(result.string_map()),
    }
}

/// Deserializes a `T` from a value tree.
///
/// # Errors
///
/// Returns an error if the tree does not fit `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T: DeserializeOwned>(value: CfgValue) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Deserializes an instance of type `T` from configuration text.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::from_str;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_str("x = 1\ny: -2").unwrap();
/// assert_eq!(point, Point { x: 1, y: -2 });
/// ```
///
/// # Errors
///
/// Returns a precondition error if `T` contains kinds the format cannot
/// hold, otherwise every structural, coercion and extra-field finding.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    from_str_with_options(s, &DecodeOptions::default())
}

/// Deserializes a `T` with key-matching options.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::{from_str_with_options, DecodeOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Debug)]
/// struct Crew { CrewMembers: u32 }
///
/// let options = DecodeOptions::new().with_allow_snake_case(true);
/// let crew: Crew = from_str_with_options("crew_members = 4", &options).unwrap();
/// assert_eq!(crew.CrewMembers, 4);
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_options<T: DeserializeOwned>(s: &str, options: &DecodeOptions) -> Result<T> {
    let descriptor = Descriptor::of::<T>()?;
    from_value(decode(s, &descriptor, options)?)
}

/// Deserializes a `T`, merging included documents through `resolver`.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::{from_str_with_resolver, DecodeOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Debug)]
/// struct App { Name: String, Port: u16 }
///
/// let mut resolver = |path: &str| -> std::io::Result<Vec<u8>> {
///     assert_eq!(path, "ports.cfg");
///     Ok(b"Port = 8080\n".to_vec())
/// };
/// let app: App = from_str_with_resolver(
///     "Name = web\ninclude ports.cfg\n",
///     &DecodeOptions::default(),
///     &mut resolver,
/// )
/// .unwrap();
/// assert_eq!(app.Port, 8080);
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_resolver<T, I>(s: &str, options: &DecodeOptions, resolver: &mut I) -> Result<T>
where
    T: DeserializeOwned,
    I: IncludeResolver + ?Sized,
{
    let descriptor = Descriptor::of::<T>()?;
    from_value(decode_with_resolver(s, &descriptor, options, resolver)?)
}

/// Deserializes a `T` from bytes of configuration text.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or do not decode into `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T: DeserializeOwned>(v: &[u8]) -> Result<T> {
    let s = std::str::from_utf8(v).map_err(|e| Error::custom(e.to_string()))?;
    from_str(s)
}

/// Deserializes a `T` from an I/O stream of configuration text.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::from_reader;
/// use serde::Deserialize;
/// use std::io::Cursor;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_reader(Cursor::new(b"x = 1\ny = 2")).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut string = String::new();
    reader.read_to_string(&mut string)?;
    from_str(&string)
}

/// Deserializes a `T` from a file, merging its includes.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, otherwise the same
/// findings as [`from_str`] plus any include failures.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_file<T, P>(path: P, options: &DecodeOptions) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let descriptor = Descriptor::of::<T>()?;
    let result = Parser::new(options.parse_options()).parse_file(path)?;
    from_value(de::decode_parsed(result, &descriptor, options)?)
}

/// Serializes a `T` to configuration text.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_string(&Point { x: 1, y: 2 }).unwrap(), "x = 1\ny = 2\n");
/// ```
///
/// # Errors
///
/// Returns an error if the root is not a struct or map, or `T` holds a kind
/// the format cannot express.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, &EncodeOptions::default())
}

/// Serializes a `T` to configuration text with key and zero-value options.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::{to_string_with_options, EncodeOptions};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Crew { CrewMembers: u32, Captain: String }
///
/// let crew = Crew { CrewMembers: 0, Captain: "Ahab".into() };
/// let options = EncodeOptions::new()
///     .with_snake_case_keys(true)
///     .with_emit_zero_values(true);
/// assert_eq!(
///     to_string_with_options(&crew, &options).unwrap(),
///     "crew_members = 0\ncaptain = Ahab\n"
/// );
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: &EncodeOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let bytes = to_vec_with_options(value, options)?;
    String::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))
}

/// Serializes a `T` to bytes of configuration text.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_vec_with_options(value, &EncodeOptions::default())
}

#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options<T>(value: &T, options: &EncodeOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    encode(&to_value(value)?, options)
}

/// Serializes a `T` to a writer.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::to_writer;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(buffer, b"x = 1\ny = 2\n");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, &EncodeOptions::default())
}

/// Serializes a `T` to a writer with options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(writer: W, value: &T, options: &EncodeOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    ser::encode_to_writer(&to_value(value)?, options, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        ratio: f64,
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: 2 };
        let text = to_string(&point).unwrap();
        let point_back: Point = from_str(&text).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_user() {
        let user = User {
            id: 123,
            name: "Alice Liddell".to_string(),
            active: true,
            ratio: 0.25,
        };

        let text = to_string(&user).unwrap();
        assert_eq!(text, "id = 123\nname = Alice Liddell\nactive = True\nratio = 0.25\n");
        let user_back: User = from_str(&text).unwrap();
        assert_eq!(user, user_back);
    }

    #[test]
    fn test_zero_fields_round_trip() {
        let user = User {
            id: 0,
            name: String::new(),
            active: false,
            ratio: 0.0,
        };
        let text = to_string(&user).unwrap();
        assert_eq!(text, "");
        // An empty document has nothing to assign.
        assert_eq!(from_str::<User>(&text).unwrap_err().to_string(), "Nothing parsed");

        let options = EncodeOptions::new().with_emit_zero_values(true);
        let text = to_string_with_options(&user, &options).unwrap();
        let user_back: User = from_str(&text).unwrap();
        assert_eq!(user, user_back);
    }

    #[test]
    fn test_to_value() {
        let point = Point { x: 1, y: 2 };
        let value = to_value(&point).unwrap();

        match value {
            CfgValue::Struct(fields) => {
                assert_eq!(fields.get("x"), Some(&CfgValue::Number(Number::Int(1))));
                assert_eq!(fields.get("y"), Some(&CfgValue::Number(Number::Int(2))));
            }
            _ => panic!("Expected struct"),
        }
    }

    #[test]
    fn test_from_value() {
        let value = to_value(&Point { x: 3, y: 4 }).unwrap();
        let point: Point = from_value(value).unwrap();
        assert_eq!(point, Point { x: 3, y: 4 });
    }

    #[test]
    fn test_map_destination() {
        let ports: HashMap<String, u16> = from_str("http = 80\nhttps = 443\n").unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports["https"], 443);
    }

    #[test]
    fn test_parse_helpers() {
        let map = parse_slice(b"A = 1\n").unwrap();
        assert_eq!(map["A"], "1");

        let map = parse_reader(&b"B: \"x y\"\n"[..]).unwrap();
        assert_eq!(map["B"], "x y");

        let options = ParseOptions::new().with_lowercase_keys(true);
        let map = parse_with_options("Mixed.Case = 1\n", &options).unwrap();
        assert!(map.contains_key("mixed.case"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file("/nonexistent/serde_cfg.cfg", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
