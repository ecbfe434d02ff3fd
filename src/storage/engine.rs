//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the core storage engine for LumenKV.
//! It provides a thread-safe HashMap of string keys to string values,
//! each with an optional expiry time.
//!
//! ## Design Decisions
//!
//! 1. **One RwLock**: The whole map sits behind a single reader/writer lock.
//!    Reads (`get`, `exists`, `ttl`) share it, mutations take it exclusively.
//! 2. **Lazy Expiry**: Reads treat a dead entry as absent without removing it.
//! 3. **Active Expiry**: `purge_expired` physically removes dead entries and is
//!    driven by the background sweeper.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │                                                             │
//! │   readers ──┐                          ┌── writers          │
//! │   get       │   ┌──────────────────┐   │   set / delete     │
//! │   exists    ├──>│ RwLock<HashMap>  │<──┤   expire / persist │
//! │   ttl       │   └──────────────────┘   │   purge_expired    │
//! │   len     ──┘                          └──                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! No guard is ever held across an `.await` or any I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: String,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry that expires `ttl` after `now`.
    ///
    /// A `ttl` too large for the platform clock leaves the entry without expiry.
    pub fn with_ttl(value: String, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now.checked_add(ttl),
        }
    }

    /// The liveness predicate shared by every read path and the sweeper.
    ///
    /// An entry without expiry is always live. An entry with expiry is dead
    /// from the instant `now` reaches `expires_at`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Remaining time to live as of `now`.
    ///
    /// Returns `None` when there is no expiry or the entry is already dead.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .and_then(|exp| exp.checked_duration_since(now))
            .filter(|left| !left.is_zero())
    }
}

/// Snapshot of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Entries physically present (live or not yet swept)
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Dead entries removed by the sweeper or by write-path cleanup
    pub expired: u64,
}

/// The main storage engine for LumenKV.
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all client handler tasks and the expiry sweeper. All operations are
/// thread-safe.
///
/// # Example
///
/// ```
/// use lumenkv::storage::StorageEngine;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name", "Ariz", None);
/// assert_eq!(engine.get("name"), Some("Ariz".to_string()));
///
/// engine.set("session", "abc123", Some(Duration::from_secs(60)));
/// assert!(engine.ttl("session").is_some());
/// ```
pub struct StorageEngine {
    data: RwLock<HashMap<String, Entry>>,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new, empty storage engine.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    // Every critical section leaves the map consistent, so a panic in another
    // holder does not invalidate the data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a key to a value, replacing whatever was there.
    ///
    /// A `None` or zero `ttl` stores the value without expiry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = match ttl.filter(|ttl| !ttl.is_zero()) {
            Some(ttl) => Entry::with_ttl(value.into(), ttl, Instant::now()),
            None => Entry::new(value.into()),
        };

        self.write().insert(key.into(), entry);
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. A dead entry
    /// is left in place for the sweeper.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }

    /// Deletes a key from the database.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was removed, `false` if it didn't exist.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.write().remove(key).is_some()
    }

    /// Checks if a key exists and is not expired.
    pub fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Sets an expiry time on an existing key.
    ///
    /// A zero `ttl` makes the entry dead immediately. A `ttl` too large for the
    /// platform clock clears the expiry instead.
    ///
    /// Only live entries are touched: an entry that is already dead is removed
    /// and reported as missing, rather than revived with a new expiry.
    ///
    /// # Returns
    ///
    /// Returns `true` if the expiry was set, `false` if the key doesn't exist
    /// or was already dead.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut data = self.write();

        if let Some(entry) = data.get_mut(key) {
            if entry.is_expired_at(now) {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            entry.expires_at = now.checked_add(ttl);
            true
        } else {
            false
        }
    }

    /// Removes the expiry from a key (makes it persistent).
    ///
    /// # Returns
    ///
    /// Returns `true` if the expiry was removed, `false` if the key doesn't exist
    /// or didn't have an expiry.
    pub fn persist(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut data = self.write();

        if let Some(entry) = data.get_mut(key) {
            if entry.is_expired_at(now) {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            return entry.expires_at.take().is_some();
        }
        false
    }

    /// Gets the remaining time to live for a key.
    ///
    /// # Returns
    ///
    /// - `Some(duration)` if the key is live and has an expiry; always non-zero
    /// - `None` if the key doesn't exist, has no expiry, or already expired
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.read()
            .get(key)
            .and_then(|entry| entry.remaining_at(now))
    }

    /// Removes every dead entry.
    ///
    /// This is called by the background expiry sweeper.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut data = self.write();
        let before = data.len();

        data.retain(|_, entry| !entry.is_expired_at(now));

        let removed = (before - data.len()) as u64;
        drop(data);

        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }

        removed
    }

    /// Returns the number of entries physically present.
    ///
    /// Dead entries count until they are swept.
    pub fn len(&self) -> u64 {
        self.read().len() as u64
    }

    /// Returns true if the database holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}
