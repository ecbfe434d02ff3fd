//! # LumenKV - An In-Memory TTL Cache
//!
//! LumenKV is a small in-memory key-value cache served over a plain-text,
//! line-oriented TCP protocol. Keys and values are strings; any key may carry
//! a time-to-live.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              LumenKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Line      │    │              StorageEngine                   │   │
//! │  │   Parser    │    │        RwLock<HashMap<String, Entry>>        │   │
//! │  └─────────────┘    └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use lumenkv::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::new(Config::default());
//!     server.run(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [ttlSeconds]` / `GET key` / `DEL key` / `EXISTS key`
//! - `EXPIRE key ttlSeconds` / `TTL key` / `PERSIST key`
//! - `PING` / `DBSIZE` / `INFO` / `QUIT`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Line framing, request tokens, and reply serialization
//! - [`storage`]: Thread-safe storage engine with TTL support
//! - [`commands`]: Command dispatch and argument validation
//! - [`connection`]: Client connection management
//! - [`server`]: Accept loop and shutdown
//! - [`config`]: Command-line configuration
//!
//! ## Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: Reads treat an expired entry as absent
//! 2. **Active**: A background task periodically removes expired entries
//!
//! Both use the same liveness check, [`storage::Entry::is_expired_at`].

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandError, CommandHandler};
pub use config::{CliAction, Config, ConfigError, DEFAULT_HOST, DEFAULT_PORT};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{LineParser, ParseError, Reply, Request};
pub use server::{serve, Server};
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// Version of LumenKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
