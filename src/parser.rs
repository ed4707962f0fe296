//! Scope parser.
//!
//! Consumes [`Scanner`] lines and builds a flat, ordered map from dotted key
//! paths to raw values. Nested blocks are flattened into `parent.child`
//! paths. Findings are accumulated so one pass reports every defect.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cfg::{ParseOptions, Parser};
//!
//! let result = Parser::new(ParseOptions::new()).parse_str("Server {\n  Port = 8080\n}\n");
//! assert!(result.error().is_none());
//! assert_eq!(result.entries["Server.Port"].value, "8080");
//! assert_eq!(result.entries["Server.Port"].line, 2);
//! ```

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result};
use crate::grammar::{is_valid_key, trim, trim_end, unescape, unwrap_quoted, GRAMMAR};
use crate::options::ParseOptions;
use crate::scanner::Scanner;
use indexmap::IndexMap;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Deepest brace nesting the parser descends into.
pub const MAX_DEPTH: usize = 64;

/// A raw value together with the line it was defined on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    pub value: String,
    pub line: usize,
    /// Set by the decoder once a destination field has read this entry.
    pub consumed: bool,
}

impl RawEntry {
    pub fn new(value: impl Into<String>, line: usize) -> Self {
        RawEntry {
            value: value.into(),
            line,
            consumed: false,
        }
    }
}

/// Flat key-path map in source order.
pub type Entries = IndexMap<String, RawEntry>;

/// Key path to unescaped value, as returned by the string-map entry points.
pub type StringMap = IndexMap<String, String>;

/// Everything one parse produced. A result with findings may still carry entries.
#[derive(Clone, Debug, Default)]
pub struct ParseResult {
    pub entries: Entries,
    /// Include paths in first-seen order, duplicates kept.
    pub includes: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl ParseResult {
    /// The accumulated findings as one error, if there are any.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        if self.diagnostics.is_empty() {
            None
        } else {
            Some(Error::Invalid(self.diagnostics.clone()))
        }
    }

    pub fn into_result(self) -> Result<Entries> {
        self.diagnostics.into_result()?;
        Ok(self.entries)
    }

    #[must_use]
    pub fn string_map(&self) -> StringMap {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Merges entries from another document. Later values win; no duplicate check.
    pub fn merge(&mut self, entries: Entries) {
        for (key, entry) in entries {
            self.entries.insert(key, entry);
        }
    }

    /// Parses every recorded include through `resolver` and merges the results.
    ///
    /// Nested includes are followed. Failures of an included document are
    /// reported as one [`DiagnosticKind::Include`] finding holding the nested
    /// report; whatever the included document did parse is still merged.
    pub fn resolve_includes<I: IncludeResolver + ?Sized>(&mut self, parser: &Parser, resolver: &mut I) {
        let mut stack = Vec::new();
        self.resolve_nested(parser, resolver, &mut stack);
    }

    fn resolve_nested<I: IncludeResolver + ?Sized>(
        &mut self,
        parser: &Parser,
        resolver: &mut I,
        stack: &mut Vec<String>,
    ) {
        let includes = self.includes.clone();
        for path in includes {
            if stack.contains(&path) {
                self.diagnostics.push(include_failure(&path, "Include cycle detected"));
                continue;
            }
            debug!(path = %path, "resolving include");
            let bytes = match resolver.resolve(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    self.diagnostics.push(include_failure(&path, &err.to_string()));
                    continue;
                }
            };
            let mut included = parser.parse_slice(&bytes);
            stack.push(path.clone());
            included.resolve_nested(parser, resolver, stack);
            stack.pop();
            if !included.diagnostics.is_empty() {
                self.diagnostics
                    .push(include_failure(&path, &included.diagnostics.to_string()));
            }
            self.merge(included.entries);
        }
    }
}

fn include_failure(path: &str, report: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::Include,
        format!("Errors in included file: {} (\n{}\n)", path, report),
        0,
    )
}

/// Turns an include path into document bytes.
pub trait IncludeResolver {
    fn resolve(&mut self, path: &str) -> io::Result<Vec<u8>>;
}

impl<F> IncludeResolver for F
where
    F: FnMut(&str) -> io::Result<Vec<u8>>,
{
    fn resolve(&mut self, path: &str) -> io::Result<Vec<u8>> {
        self(path)
    }
}

/// Reads includes from the filesystem.
///
/// Relative paths are taken relative to the base directory if one is set,
/// otherwise relative to the process working directory.
#[derive(Clone, Debug, Default)]
pub struct FileResolver {
    base_dir: Option<PathBuf>,
}

impl FileResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

impl IncludeResolver for FileResolver {
    fn resolve(&mut self, path: &str) -> io::Result<Vec<u8>> {
        match &self.base_dir {
            Some(base) => fs::read(base.join(path)),
            None => fs::read(path),
        }
    }
}

/// Line-oriented scope parser. Holds only options; every call owns its own state.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    options: ParseOptions,
}

impl Parser {
    #[must_use]
    pub fn new(options: ParseOptions) -> Self {
        Parser { options }
    }

    pub fn parse<R: BufRead>(&self, reader: R) -> ParseResult {
        let mut state = ParseState {
            scanner: Scanner::new(reader),
            lowercase_keys: self.options.lowercase_keys,
            includes: Vec::new(),
            diagnostics: Diagnostics::new(),
            eof: false,
        };
        let entries = state.parse_scope(0).unwrap_or_default();
        if entries.is_empty() && state.includes.is_empty() {
            state.diagnostics.push(Diagnostic::structural("Nothing parsed", 0));
        }
        debug!(
            entries = entries.len(),
            includes = state.includes.len(),
            findings = state.diagnostics.len(),
            "parsed document"
        );
        ParseResult {
            entries,
            includes: state.includes,
            diagnostics: state.diagnostics,
        }
    }

    pub fn parse_str(&self, input: &str) -> ParseResult {
        self.parse(input.as_bytes())
    }

    pub fn parse_slice(&self, input: &[u8]) -> ParseResult {
        self.parse(input)
    }

    /// Parses a file and resolves its includes through a [`FileResolver`].
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParseResult> {
        let file = fs::File::open(path.as_ref())?;
        let mut result = self.parse(BufReader::new(file));
        result.resolve_includes(self, &mut FileResolver::new());
        Ok(result)
    }
}

enum Slot {
    /// Placeholder for a block key so it cannot be redefined in the same scope.
    Block,
    Value(RawEntry),
}

struct ParseState<R> {
    scanner: Scanner<R>,
    lowercase_keys: bool,
    includes: Vec<String>,
    diagnostics: Diagnostics,
    eof: bool,
}

impl<R: BufRead> ParseState<R> {
    fn line(&self) -> usize {
        self.scanner.line()
    }

    fn error(&mut self, message: impl Into<String>, line: usize) {
        self.diagnostics.push(Diagnostic::structural(message, line));
    }

    fn next_line(&mut self) -> Option<String> {
        if self.eof {
            return None;
        }
        let next = self.scanner.next_line();
        self.settle(next)
    }

    fn next_raw_line(&mut self) -> Option<String> {
        if self.eof {
            return None;
        }
        let next = self.scanner.next_raw_line();
        self.settle(next)
    }

    fn settle(&mut self, next: io::Result<Option<String>>) -> Option<String> {
        match next {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.eof = true;
                None
            }
            Err(err) => {
                self.eof = true;
                let line = self.line();
                self.error(format!("Read error: {}", err), line);
                None
            }
        }
    }

    fn key(&self, raw: &str) -> String {
        if self.lowercase_keys {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        }
    }

    /// Parses one scope. Returns `None` if input ended before the closing brace.
    fn parse_scope(&mut self, depth: usize) -> Option<Entries> {
        let mut scope: IndexMap<String, Slot> = IndexMap::new();
        loop {
            let Some(line) = self.next_line() else {
                if depth > 0 {
                    return None;
                }
                break;
            };
            let g = &*GRAMMAR;
            if let Some(caps) = g.include.captures(&line) {
                let path = caps[1].to_string();
                trace!(path = %path, line = self.line(), "include recorded");
                self.includes.push(path);
            } else if let Some(caps) = g.open_brace.captures(&line) {
                let key = self.key(&caps[1]);
                self.parse_block(&mut scope, key, depth);
            } else if g.close_brace.is_match(&line) {
                if depth > 0 {
                    break;
                }
                let line = self.line();
                self.error("Invalid data", line);
            } else if let Some(caps) = g.heredoc.captures(&line) {
                let key = self.key(&caps[1]);
                let header = self.line();
                match self.read_heredoc(&caps[2]) {
                    Some(body) => {
                        let line = self.line();
                        self.insert_value(&mut scope, key, &body, line);
                    }
                    None => self.error("No terminating heredoc code", header),
                }
            } else if let Some(caps) = g.multiline.captures(&line) {
                let key = self.key(&caps[1]);
                let value = self.read_multiline(&caps[2]);
                let line = self.line();
                self.insert_value(&mut scope, key, &value, line);
            } else if let Some(caps) = g.key_value.captures(&line) {
                let key = self.key(&caps[1]);
                let line = self.line();
                self.insert_value(&mut scope, key, &caps[2], line);
            } else {
                let line = self.line();
                self.error("Invalid data", line);
            }
        }
        Some(
            scope
                .into_iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Value(entry) => Some((key, entry)),
                    Slot::Block => None,
                })
                .collect(),
        )
    }

    fn parse_block(&mut self, scope: &mut IndexMap<String, Slot>, key: String, depth: usize) {
        let open_line = self.line();
        if depth + 1 > MAX_DEPTH {
            self.error("Maximum nesting depth exceeded", open_line);
            self.skip_block();
            return;
        }
        trace!(key = %key, line = open_line, depth = depth + 1, "entering block");
        let Some(children) = self.parse_scope(depth + 1) else {
            self.error("Missing closing brace", open_line);
            return;
        };
        trace!(key = %key, children = children.len(), "leaving block");
        if scope.contains_key(&key) {
            self.error("Duplicate key", open_line);
            return;
        }
        if !is_valid_key(&key) {
            self.error("Invalid key", open_line);
            return;
        }
        let prefix = key.clone();
        scope.insert(key, Slot::Block);
        for (child, entry) in children {
            let path = format!("{}.{}", prefix, child);
            if scope.contains_key(&path) {
                self.error("Duplicate key", entry.line);
                continue;
            }
            scope.insert(path, Slot::Value(entry));
        }
    }

    /// Skips a block that is nested too deeply, up to its matching close.
    fn skip_block(&mut self) {
        let mut open = 1usize;
        while let Some(line) = self.next_line() {
            if GRAMMAR.open_brace.is_match(&line) {
                open += 1;
            } else if GRAMMAR.close_brace.is_match(&line) {
                open -= 1;
                if open == 0 {
                    return;
                }
            }
        }
    }

    /// Collects heredoc lines up to the terminator. `None` if input ends first.
    fn read_heredoc(&mut self, token: &str) -> Option<String> {
        let mut body: Vec<String> = Vec::new();
        while let Some(raw) = self.next_raw_line() {
            if trim(&raw) == token {
                return Some(body.join("\n"));
            }
            body.push(trim_end(&raw).to_string());
        }
        None
    }

    fn read_multiline(&mut self, first: &str) -> String {
        let mut content = unwrap_quoted(first).to_string();
        loop {
            let Some(line) = self.next_line() else {
                let line = self.line();
                self.error("EOF encountered before multiline termination", line);
                break;
            };
            match line.strip_suffix('\\') {
                Some(segment) => content.push_str(unwrap_quoted(segment)),
                None => {
                    content.push_str(unwrap_quoted(&line));
                    break;
                }
            }
        }
        content
    }

    fn insert_value(&mut self, scope: &mut IndexMap<String, Slot>, key: String, raw: &str, line: usize) {
        if scope.contains_key(&key) {
            self.error("Duplicate key", line);
            return;
        }
        if !is_valid_key(&key) {
            self.error("Invalid key", line);
            return;
        }
        match unescape(raw) {
            Ok(value) => {
                scope.insert(key, Slot::Value(RawEntry::new(value, line)));
            }
            Err(message) => self.error(message, line),
        }
    }
}
