//! Grammar of the configuration format.
//!
//! # Overview
//!
//! A document is a sequence of lines. Each logical line (comment stripped,
//! whitespace trimmed) is one of:
//!
//! ```text
//! include other.cfg                 # record another document to merge
//! Server = {                        # open a nested block (also `Server {`, `Server: {`)
//!   Port = 8080                     # key/value; separators are `=`, `:` or whitespace
//!   Name: "  padded  "              # quoted values keep inner whitespace and escapes
//! }                                 # close the block
//! Motd = <<EOF                      # heredoc: literal lines up to the terminator
//!   Welcome!
//! EOF
//! Long = first part \               # multiline: a trailing backslash continues
//!        "second part"
//! ```
//!
//! Keys are `[A-Za-z0-9_.]+` and address a flat namespace: `Server { Port = 1 }`
//! and `Server.Port = 1` are the same entry. A key may not start or end with
//! `.`, contain `..`, or be exactly `_`. Block keys may not contain dots.
//!
//! The comment marker `#` cannot be escaped; a `#` inside quotes still starts a
//! comment. The encoder writes `#` as `\x23` for that reason.
//!
//! # Values
//!
//! Every value passes through one unescape step: a fully quote-wrapped value
//! loses its quotes, then backslash escapes are decoded (`\n`, `\t`, `\\`,
//! `\"`, `\xHH`, octal `\NNN`, `\uXXXX`, `\UXXXXXXXX`, `\a \b \f \r \v`).
//! Quotes embedded in the middle of a value are kept literally.
//!
//! The pattern table is built once per process and never mutated.

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) struct Grammar {
    pub include: Regex,
    pub open_brace: Regex,
    pub close_brace: Regex,
    pub heredoc: Regex,
    pub multiline: Regex,
    pub key_value: Regex,
    pub quoted: Regex,
    pub block_key: Regex,
    pub entry_key: Regex,
}

/// Lines are matched against these patterns in declaration order; first match wins.
pub(crate) static GRAMMAR: Lazy<Grammar> = Lazy::new(|| Grammar {
    include: Regex::new(r#"^(?i:include) +"?([^"=]*)"?$"#).unwrap(),
    open_brace: Regex::new(r"^([A-Za-z0-9_]+)\s*[=:\s]\s*\{").unwrap(),
    close_brace: Regex::new(r"^\}").unwrap(),
    heredoc: Regex::new(r"^([A-Za-z0-9_.]+)\s*[=:\s]\s*<<([A-Za-z0-9_]+)").unwrap(),
    multiline: Regex::new(r"^([A-Za-z0-9_.]+)\s*[=:\s]\s*(.*)\\$").unwrap(),
    key_value: Regex::new(r"^([A-Za-z0-9_.]+)\s*[=:\s]\s*(.+)$").unwrap(),
    quoted: Regex::new(r#"^"(.+)"\s*$"#).unwrap(),
    block_key: Regex::new(r"^[A-Za-z0-9_]+$").unwrap(),
    entry_key: Regex::new(r"^[A-Za-z0-9_.]+$").unwrap(),
});

#[inline]
fn is_space(c: char) -> bool {
    matches!(c, '\t'..='\r' | ' ')
}

/// Trims spaces and the control range 0x09-0x0D from both ends.
pub(crate) fn trim(s: &str) -> &str {
    s.trim_matches(is_space)
}

pub(crate) fn trim_end(s: &str) -> &str {
    s.trim_end_matches(is_space)
}

/// Rejects keys with a leading or trailing dot, adjacent dots, or a lone underscore.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !(key.starts_with('.') || key.ends_with('.') || key.contains("..") || key == "_")
}

/// Keys the encoder can write for a nested block; block keys carry no dots.
pub(crate) fn is_block_key(key: &str) -> bool {
    GRAMMAR.block_key.is_match(key) && is_valid_key(key)
}

/// Keys the encoder can write for a scalar line.
pub(crate) fn is_entry_key(key: &str) -> bool {
    GRAMMAR.entry_key.is_match(key) && is_valid_key(key)
}

/// Unwraps a value that is entirely quote-wrapped, as continuation segments are.
pub(crate) fn unwrap_quoted(s: &str) -> &str {
    match GRAMMAR.quoted.captures(s).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => s,
    }
}

/// Decodes a raw value. The error carries the full diagnostic message.
pub(crate) fn unescape(raw: &str) -> Result<String, String> {
    let mut s = raw;
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s = &s[1..s.len() - 1];
    }
    let content = s.replace('\n', "\\n");
    decode_escapes(&content).ok_or_else(|| format!("invalid syntax: Unquote({})", content))
}

fn decode_escapes(s: &str) -> Option<String> {
    let mut out: Vec<u8> = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut utf8 = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            continue;
        }
        match chars.next()? {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0B),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            'x' => {
                let value = take_digits(&mut chars, 2, 16)?;
                out.push(u8::try_from(value).ok()?);
            }
            first @ '0'..='7' => {
                let rest = take_digits(&mut chars, 2, 8)?;
                let value = first.to_digit(8)? * 64 + rest;
                out.push(u8::try_from(value).ok()?);
            }
            'u' => push_char(&mut out, take_digits(&mut chars, 4, 16)?)?,
            'U' => push_char(&mut out, take_digits(&mut chars, 8, 16)?)?,
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

fn take_digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, code_point: u32) -> Option<()> {
    let ch = char::from_u32(code_point)?;
    let mut utf8 = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
    Some(())
}

/// Quotes `s` using only printable ASCII, escaping everything else.
pub(crate) fn quote_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            '#' => out.push_str("\\x23"),
            ' '..='~' => out.push(ch),
            c if (c as u32) < 0x80 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

/// Snake-cases an identifier: underscores go at lower-to-upper boundaries
/// and on both sides of digit runs. `Camel2Snake` becomes `camel_2_snake`.
pub(crate) fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let (mut last_digit, mut last_upper, mut last_lower) = (false, false, false);
    let mut run = 0usize;
    for c in s.chars() {
        run += 1;
        let digit = c.is_ascii_digit();
        let lower = c.is_ascii_lowercase();
        let upper = c.is_ascii_uppercase();
        if c == '_' {
            run = 0;
        }
        if run > 1 && digit != last_digit {
            out.push('_');
        } else if run > 1 && upper != last_upper && last_lower {
            out.push('_');
            run = 0;
        }
        out.push(c.to_ascii_lowercase());
        last_digit = digit;
        last_upper = upper;
        last_lower = lower;
    }
    out
}

pub(crate) fn to_lower(s: &str) -> String {
    s.to_ascii_lowercase()
}
