//! Line Protocol Data Types
//!
//! This module defines the request and reply types of the LumenKV text protocol.
//!
//! ## Protocol Format
//!
//! Every request is one line of whitespace-separated fields terminated by `\n`.
//! Every reply is exactly one line terminated by `\n`:
//!
//! | Reply      | Wire form              |
//! |------------|------------------------|
//! | `Ok`       | `OK`                   |
//! | `Value`    | the stored string      |
//! | `Nil`      | `(nil)`                |
//! | `Integer`  | `1`, `0`, `42`         |
//! | `Duration` | `4.998s`, or `-1`      |
//! | `Pong`     | `PONG`                 |
//! | `Error`    | `ERROR: <message>`     |

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::time::Duration;

/// The line terminator used for requests and replies
pub const LF: u8 = b'\n';

/// Prefix placed in front of every error reply
pub const ERROR_PREFIX: &str = "ERROR: ";

/// One tokenized request line.
///
/// The first token is the command name, the rest are its arguments.
/// An empty or whitespace-only line yields an empty request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    tokens: Vec<String>,
}

impl Request {
    /// Splits a line on ASCII/Unicode whitespace.
    pub fn from_line(line: &str) -> Self {
        Self {
            tokens: line.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Builds a request from already separated tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true for a blank line.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The command name as sent by the client.
    pub fn name(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// The arguments following the command name.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

/// A reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Acknowledgement of a write
    Ok,
    /// A stored string value
    Value(String),
    /// Key missing or expired
    Nil,
    /// Boolean answers (`1`/`0`) and counts
    Integer(i64),
    /// Remaining time to live; `None` is the "no TTL" sentinel
    Duration(Option<Duration>),
    /// Answer to PING
    Pong,
    /// A protocol error; the connection stays open
    Error(String),
}

impl Reply {
    /// Creates a new error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Creates `1` or `0` from a boolean.
    pub fn flag(value: bool) -> Self {
        Reply::Integer(i64::from(value))
    }

    /// Returns true if this is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Serializes the reply into its wire form, including the trailing `\n`.
    pub fn serialize(&self) -> Bytes {
        let text = self.to_string();
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        buf.put_slice(text.as_bytes());
        buf.put_u8(LF);
        buf.freeze()
    }
}

/// Renders a remaining TTL as seconds with millisecond precision.
///
/// Rounds up, so a live key never reads as `0.000s`.
fn format_duration(left: Duration) -> String {
    let millis = left.as_nanos().div_ceil(1_000_000);
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Value(value) => write!(f, "{}", value),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Duration(Some(left)) => write!(f, "{}", format_duration(*left)),
            Reply::Duration(None) => write!(f, "-1"),
            Reply::Pong => write!(f, "PONG"),
            Reply::Error(message) => write!(f, "{}{}", ERROR_PREFIX, message),
        }
    }
}
