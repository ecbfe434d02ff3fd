//! Line Protocol Implementation
//!
//! LumenKV speaks a small text protocol: one whitespace-separated command per
//! `\n`-terminated line, one `\n`-terminated reply line per command.
//!
//! ## Modules
//!
//! - `types`: The `Request` and `Reply` types and reply serialization
//! - `parser`: Frames request lines out of a byte buffer
//!
//! ## Example
//!
//! ```
//! use lumenkv::protocol::{parse_line, Reply};
//!
//! let (request, consumed) = parse_line(b"GET name\n").unwrap().unwrap();
//! assert_eq!(request.name(), Some("GET"));
//! assert_eq!(consumed, 9);
//!
//! let bytes = Reply::Value("Ariz".to_string()).serialize();
//! assert_eq!(&bytes[..], b"Ariz\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_line, LineParser, ParseError, ParseResult, MAX_LINE_LENGTH};
pub use types::{Reply, Request};
