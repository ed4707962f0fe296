//! Options for parsing, decoding and encoding.
//!
//! - [`ParseOptions`]: how the parser reports keys
//! - [`DecodeOptions`]: how the decoder matches keys to destination fields
//! - [`EncodeOptions`]: how the encoder spells keys and whether zero values are written
//!
//! Decode-side and encode-side key transforms are independent.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cfg::{from_str_with_options, DecodeOptions};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Crew { crew_members: u32 }
//!
//! let options = DecodeOptions::new().with_allow_snake_case(true);
//! let crew: Crew = from_str_with_options("crew_members = 4", &options).unwrap();
//! assert_eq!(crew.crew_members, 4);
//! ```

/// Options for the scope parser.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Lower-case every key path before returning it.
    pub lowercase_keys: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every key path in lower case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::{parse_with_options, ParseOptions};
    ///
    /// let map = parse_with_options("PlainString = x", &ParseOptions::new().with_lowercase_keys(true)).unwrap();
    /// assert_eq!(map.get("plainstring").map(String::as_str), Some("x"));
    /// ```
    #[must_use]
    pub fn with_lowercase_keys(mut self, lowercase_keys: bool) -> Self {
        self.lowercase_keys = lowercase_keys;
        self
    }
}

/// Options for the structural walker.
///
/// Key lookup always tries the exact key path first. The fallbacks below are
/// tried in order only when enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fall back to the snake_case form of the key path, e.g. `crew_members`
    /// for `CrewMembers`.
    pub allow_snake_case: bool,
    /// Fall back to the fully lower-cased key path, e.g. `crewmembers`.
    pub ignore_case: bool,
    /// Lower-case keys while parsing. Lookups then use the lower-cased form.
    pub lowercase_keys: bool,
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allow_snake_case(mut self, allow_snake_case: bool) -> Self {
        self.allow_snake_case = allow_snake_case;
        self
    }

    #[must_use]
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    #[must_use]
    pub fn with_lowercase_keys(mut self, lowercase_keys: bool) -> Self {
        self.lowercase_keys = lowercase_keys;
        self
    }

    pub(crate) fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            lowercase_keys: self.lowercase_keys,
        }
    }

    pub(crate) fn lowercase_lookup(&self) -> bool {
        self.ignore_case || self.lowercase_keys
    }
}

/// Options for the structural renderer.
///
/// # Examples
///
/// ```rust
/// use serde_cfg::EncodeOptions;
///
/// let options = EncodeOptions::new()
///     .with_snake_case_keys(true)
///     .with_emit_zero_values(true);
/// assert!(options.snake_case_keys);
/// assert!(!options.lowercase_keys);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write every key in lower case (`MixedCase` -> `mixedcase`).
    pub lowercase_keys: bool,
    /// Write every key in snake_case (`MixedCase` -> `mixed_case`).
    pub snake_case_keys: bool,
    /// Write zero numbers, `false`, empty strings and zero times instead of
    /// suppressing them.
    pub emit_zero_values: bool,
}

impl EncodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_lowercase_keys(mut self, lowercase_keys: bool) -> Self {
        self.lowercase_keys = lowercase_keys;
        self
    }

    #[must_use]
    pub fn with_snake_case_keys(mut self, snake_case_keys: bool) -> Self {
        self.snake_case_keys = snake_case_keys;
        self
    }

    #[must_use]
    pub fn with_emit_zero_values(mut self, emit_zero_values: bool) -> Self {
        self.emit_zero_values = emit_zero_values;
        self
    }
}
