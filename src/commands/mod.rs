//! Command Handler Module
//!
//! This module implements the command processing layer for LumenKV.
//! It receives tokenized request lines, executes them against the storage
//! engine, and returns the reply.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET`, `GET`, `DEL`, `EXISTS`
//! - `EXPIRE`, `TTL`, `PERSIST`
//! - `PING`, `DBSIZE`, `INFO`, `QUIT`

pub mod handler;

// Re-export the main command handler
pub use handler::{CommandError, CommandHandler, CommandKind};
