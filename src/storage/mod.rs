//! Storage Engine Module
//!
//! This module provides the core storage functionality for LumenKV:
//! a thread-safe key-value store with TTL support and a background
//! expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │             RwLock<HashMap<String, Entry>>                  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ purge_expired()
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use lumenkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set("name", "Ariz", None);
//! assert_eq!(engine.get("name"), Some("Ariz".to_string()));
//!
//! engine.set("session", "token123", Some(Duration::from_secs(3600)));
//! assert!(engine.exists("session"));
//! ```

pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use engine::{Entry, StorageEngine, StorageStats};
pub use expiry::{ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
