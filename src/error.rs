//! Error types for configuration parsing, decoding and encoding.
//!
//! Errors travel on two channels:
//!
//! - **Data validation** ([`Error::Invalid`]): findings about the document
//!   itself. The parser and the decoder keep going after a finding, so one
//!   pass reports every defect. Each finding is a [`Diagnostic`] carrying the
//!   source line where it is known.
//! - **Preconditions** ([`Error::TypeNotAllowed`], [`Error::Precondition`],
//!   [`Error::Unsupported`]): the caller asked for something the format
//!   cannot express, such as decoding into a `Vec`. These fail immediately.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cfg::parse_str;
//!
//! let err = parse_str("K=1\nK=2\n").unwrap_err();
//! assert_eq!(err.to_string(), "Duplicate key at line 2");
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur while handling configuration text.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// One or more findings about the document, one per line in encounter order.
    #[error("{0}")]
    Invalid(Diagnostics),

    /// The destination type contains a kind the format cannot represent.
    #[error("{}type {kind} not allowed", path_prefix(.path))]
    TypeNotAllowed { kind: String, path: String },

    /// The caller misused the API (wrong root kind, non-string map keys, ...).
    #[error("{0}")]
    Precondition(String),

    /// A value of this kind cannot be encoded.
    #[error("Cannot encode type ({0})")]
    Unsupported(String),

    /// IO error while reading a source or writing to a sink
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error raised through serde
    #[error("{0}")]
    Custom(String),
}

fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{} ", path)
    }
}

impl Error {
    /// Creates a type-not-allowed error for the given serde kind and key path.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::Error;
    ///
    /// let err = Error::type_not_allowed("seq", "Key1");
    /// assert_eq!(err.to_string(), "Key1 type seq not allowed");
    /// ```
    pub fn type_not_allowed(kind: &str, path: &str) -> Self {
        Error::TypeNotAllowed {
            kind: kind.to_string(),
            path: path.to_string(),
        }
    }

    /// Creates a precondition error for API misuse.
    pub fn precondition(msg: &str) -> Self {
        Error::Precondition(msg.to_string())
    }

    /// Creates an unsupported-type error for values that cannot be encoded.
    pub fn unsupported(kind: &str) -> Self {
        Error::Unsupported(kind.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns the accumulated findings if this is a data-validation error.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::Invalid(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<Diagnostics> for Error {
    fn from(diagnostics: Diagnostics) -> Self {
        Error::Invalid(diagnostics)
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The stage that produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Bad or duplicate key, invalid line, missing brace, unterminated
    /// heredoc or multiline, unescape failure.
    Structural,
    /// A raw value could not be converted to its destination kind.
    Coercion,
    /// An entry had no destination (extra field).
    Schema,
    /// An included document failed; the message nests its own report.
    Include,
}

/// A single finding, optionally attributed to a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Creates a finding. A line of `0` means "no line".
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: usize) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            line: if line > 0 { Some(line) } else { None },
        }
    }

    pub fn structural(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Structural, message, line)
    }

    pub fn coercion(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Coercion, message, line)
    }

    pub fn schema(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagnosticKind::Schema, message, line)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {}", self.message, line),
            None => f.write_str(&self.message),
        }
    }
}

/// An ordered collection of findings reported together as one failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Converts the findings into `Err` if there are any.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid(self))
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Diagnostics(diagnostics)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Failure to convert a raw string into a scalar kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Overflow")]
    Overflow,

    #[error("Invalid numeric abbreviation")]
    InvalidAbbreviation,

    #[error("Invalid char")]
    InvalidChar,

    #[error("parsing {input:?}: invalid syntax")]
    InvalidNumber { input: String },

    #[error("parsing time {input:?}: unrecognized layout")]
    InvalidTime { input: String },
}
