//! Line Protocol Parser
//!
//! This module frames newline-terminated requests out of a byte buffer.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((request, consumed)))` - A full line was found, `consumed` bytes were used
//! - `Ok(None)` - No `\n` yet, the line is incomplete
//! - `Err(ParseError)` - The line exceeds the maximum length
//!
//! This lets the caller append network data to a buffer, parse as many full
//! lines as are available, advance the buffer, and wait for more otherwise.

use crate::protocol::types::{Request, LF};
use thiserror::Error;

/// Errors that can occur while framing request lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line (complete or still buffering) is longer than allowed
    #[error("line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single request line, terminator excluded (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A newline-delimited request parser.
///
/// # Example
///
/// ```
/// use lumenkv::protocol::LineParser;
///
/// let parser = LineParser::new();
/// let (request, consumed) = parser.parse(b"GET name\nSET").unwrap().unwrap();
///
/// assert_eq!(request.name(), Some("GET"));
/// assert_eq!(consumed, 9);
/// assert!(parser.parse(b"SET").unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LineParser {
    max_line_length: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Creates a parser with a custom line length limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    /// Attempts to parse one request line from the front of `buf`.
    ///
    /// A trailing `\r` is dropped. Invalid UTF-8 is replaced rather than
    /// rejected, so a garbled line still gets an (unknown command) reply.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        let Some(end) = buf.iter().position(|&b| b == LF) else {
            if buf.len() > self.max_line_length {
                return Err(ParseError::LineTooLong {
                    size: buf.len(),
                    max: self.max_line_length,
                });
            }
            return Ok(None);
        };

        let mut line = &buf[..end];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }

        if line.len() > self.max_line_length {
            return Err(ParseError::LineTooLong {
                size: line.len(),
                max: self.max_line_length,
            });
        }

        let request = Request::from_line(&String::from_utf8_lossy(line));
        Ok(Some((request, end + 1)))
    }
}

/// Convenience function to parse a single line with the default limit.
pub fn parse_line(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    LineParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_line() {
        let (request, consumed) = parse_line(b"SET key value\n").unwrap().unwrap();
        assert_eq!(request, Request::from_tokens(["SET", "key", "value"]));
        assert_eq!(consumed, 14);
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(parse_line(b"").unwrap(), None);
        assert_eq!(parse_line(b"GET ke").unwrap(), None);
    }

    #[test]
    fn test_parse_crlf() {
        let (request, consumed) = parse_line(b"GET key\r\n").unwrap().unwrap();
        assert_eq!(request, Request::from_tokens(["GET", "key"]));
        assert_eq!(consumed, 9);
    }

    #[test]
    fn test_parse_empty_line() {
        let (request, consumed) = parse_line(b"\n").unwrap().unwrap();
        assert!(request.is_empty());
        assert_eq!(consumed, 1);

        let (request, _) = parse_line(b"   \r\n").unwrap().unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn test_parse_multiple_lines() {
        let buf = b"SET a 1\nGET a\n";
        let parser = LineParser::new();

        let (first, consumed) = parser.parse(buf).unwrap().unwrap();
        assert_eq!(first.name(), Some("SET"));

        let (second, rest) = parser.parse(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(second.name(), Some("GET"));
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let (request, _) = parse_line(b"GET \xff\xfe\n").unwrap().unwrap();
        assert_eq!(request.name(), Some("GET"));
        assert_eq!(request.args().len(), 1);
    }

    #[test]
    fn test_line_too_long() {
        let parser = LineParser::with_max_line_length(8);

        assert!(parser.parse(b"GET short\n").is_err());
        assert_eq!(
            parser.parse(b"GET waytoolong"),
            Err(ParseError::LineTooLong { size: 14, max: 8 })
        );
        assert!(parser.parse(b"GET abc\n").unwrap().is_some());
    }
}
