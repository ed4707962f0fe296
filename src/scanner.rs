//! Line scanner.
//!
//! Turns a byte stream into logical lines: each physical line loses its
//! `#` comment and surrounding whitespace, and lines that end up empty are
//! skipped. The line counter advances for every physical line, skipped or
//! not, so reported numbers match the source.

use crate::grammar::trim;
use std::io::{self, BufRead};

/// A lazy, non-restartable sequence of logical lines.
pub struct Scanner<R> {
    reader: R,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Scanner {
            reader,
            line: 0,
            buf: Vec::with_capacity(128),
        }
    }

    /// The number of the last physical line read (1-based, `0` before the first read).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next non-empty logical line, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(raw) = self.next_raw_line()? else {
                return Ok(None);
            };
            let content = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw.as_str(),
            };
            let content = trim(content);
            if !content.is_empty() {
                return Ok(Some(content.to_string()));
            }
        }
    }

    /// Returns the next physical line verbatim, without its terminator.
    ///
    /// Used for heredoc bodies, where comments and leading whitespace are content.
    /// A line that is not valid UTF-8 fails with [`io::ErrorKind::InvalidData`].
    pub fn next_raw_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        match std::str::from_utf8(&self.buf) {
            Ok(text) => Ok(Some(text.to_string())),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8",
            )),
        }
    }
}

impl<R: BufRead> Iterator for Scanner<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> Vec<(usize, String)> {
        let mut scanner = Scanner::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(line) = scanner.next_line().unwrap() {
            out.push((scanner.line(), line));
        }
        out
    }

    #[test]
    fn test_skips_blank_and_comment_lines_but_counts_them() {
        let input = "\n# heading\n  Key = 1   # trailing\n\n\tOther: 2\n";
        assert_eq!(
            lines(input),
            vec![(3, "Key = 1".to_string()), (5, "Other: 2".to_string())]
        );
    }

    #[test]
    fn test_final_line_without_terminator() {
        assert_eq!(lines("A = 1\nB = 2"), vec![
            (1, "A = 1".to_string()),
            (2, "B = 2".to_string())
        ]);
    }

    #[test]
    fn test_comment_marker_is_not_escapable() {
        assert_eq!(lines(r#"Key = "a#b""#), vec![(1, r#"Key = "a"#.to_string())]);
    }

    #[test]
    fn test_raw_line_keeps_whitespace_and_hash() {
        let mut scanner = Scanner::new("  # not a comment  \r\nnext".as_bytes());
        assert_eq!(
            scanner.next_raw_line().unwrap().as_deref(),
            Some("  # not a comment  \r")
        );
        assert_eq!(scanner.line(), 1);
        assert_eq!(scanner.next_line().unwrap().as_deref(), Some("next"));
        assert_eq!(scanner.next_line().unwrap(), None);
        assert_eq!(scanner.line(), 2);
    }

    #[test]
    fn test_invalid_utf8_fails_the_line() {
        let mut scanner = Scanner::new(&b"A = 1\nB = \xff\n"[..]);
        assert_eq!(scanner.next_line().unwrap().as_deref(), Some("A = 1"));
        let err = scanner.next_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(scanner.line(), 2);
    }

    #[test]
    fn test_iterator_yields_lines() {
        let collected: Vec<String> = Scanner::new("a 1\n\nb 2\n".as_bytes())
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(collected, vec!["a 1", "b 2"]);
    }
}
