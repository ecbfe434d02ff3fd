//! Command Handler Module
//!
//! This module implements the LumenKV commands. It takes tokenized request
//! lines and dispatches them to the appropriate handlers.
//!
//! ## Supported Commands
//!
//! ### Key Commands
//! - `SET key value [ttlSeconds]` - Set a key, optionally expiring
//! - `GET key` - Get a key's value
//! - `DEL key` - Delete a key
//! - `EXISTS key` - Check if a key exists
//! - `EXPIRE key ttlSeconds` - Set expiry on an existing key
//! - `TTL key` - Get remaining time to live
//! - `PERSIST key` - Remove expiry
//!
//! ### Server Commands
//! - `PING` - Test connection
//! - `DBSIZE` - Number of stored entries
//! - `INFO` - Engine counters
//! - `QUIT` - Close the connection
//!
//! ## Argument Handling
//!
//! Too few arguments produce a "missing arguments" error reply; surplus
//! arguments are ignored. Numeric arguments that fail to parse count as 0.

use crate::protocol::{Reply, Request};
use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Protocol errors reported back to the client.
///
/// The `Display` text is what follows `ERROR: ` on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Fewer arguments than the command needs
    #[error("missing arguments")]
    MissingArguments,

    /// The command name is not recognized
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::error(err.to_string())
    }
}

/// The recognized command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Set,
    Get,
    Del,
    Exists,
    Expire,
    Ttl,
    Persist,
    Ping,
    DbSize,
    Info,
    Quit,
}

impl CommandKind {
    /// Matches a command name case-insensitively.
    pub fn lookup(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "SET" => CommandKind::Set,
            "GET" => CommandKind::Get,
            "DEL" => CommandKind::Del,
            "EXISTS" => CommandKind::Exists,
            "EXPIRE" => CommandKind::Expire,
            "TTL" => CommandKind::Ttl,
            "PERSIST" => CommandKind::Persist,
            "PING" => CommandKind::Ping,
            "DBSIZE" => CommandKind::DbSize,
            "INFO" => CommandKind::Info,
            "QUIT" => CommandKind::Quit,
            _ => return None,
        };
        Some(kind)
    }

    /// Number of arguments required after the command name.
    pub fn min_args(self) -> usize {
        match self {
            CommandKind::Set | CommandKind::Expire => 2,
            CommandKind::Get
            | CommandKind::Del
            | CommandKind::Exists
            | CommandKind::Ttl
            | CommandKind::Persist => 1,
            CommandKind::Ping | CommandKind::DbSize | CommandKind::Info | CommandKind::Quit => 0,
        }
    }
}

/// Handles commands by dispatching them to the storage engine.
#[derive(Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a request and returns the reply.
    ///
    /// Returns `None` for a blank line, which gets no reply at all.
    pub fn execute(&self, request: &Request) -> Option<Reply> {
        let name = request.name()?;

        let reply = match self.dispatch(name, request.args()) {
            Ok(reply) => reply,
            Err(err) => err.into(),
        };
        Some(reply)
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, name: &str, args: &[String]) -> Result<Reply, CommandError> {
        let kind = CommandKind::lookup(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_ascii_uppercase()))?;

        if args.len() < kind.min_args() {
            return Err(CommandError::MissingArguments);
        }

        let reply = match kind {
            CommandKind::Set => self.cmd_set(args),
            CommandKind::Get => self.cmd_get(args),
            CommandKind::Del => self.cmd_del(args),
            CommandKind::Exists => self.cmd_exists(args),
            CommandKind::Expire => self.cmd_expire(args),
            CommandKind::Ttl => self.cmd_ttl(args),
            CommandKind::Persist => self.cmd_persist(args),
            CommandKind::Ping => Reply::Pong,
            CommandKind::DbSize => Reply::Integer(self.storage.len() as i64),
            CommandKind::Info => self.cmd_info(),
            CommandKind::Quit => Reply::Ok,
        };
        Ok(reply)
    }

    // ========================================================================
    // Key Commands
    // ========================================================================

    /// SET key value [ttlSeconds]
    fn cmd_set(&self, args: &[String]) -> Reply {
        let ttl = args
            .get(2)
            .map(|secs| parse_seconds(secs))
            .filter(|&secs| secs > 0)
            .map(|secs| Duration::from_secs(secs as u64));

        self.storage.set(args[0].as_str(), args[1].as_str(), ttl);
        Reply::Ok
    }

    /// GET key
    fn cmd_get(&self, args: &[String]) -> Reply {
        match self.storage.get(&args[0]) {
            Some(value) => Reply::Value(value),
            None => Reply::Nil,
        }
    }

    /// DEL key
    fn cmd_del(&self, args: &[String]) -> Reply {
        self.storage.delete(&args[0]);
        Reply::Ok
    }

    /// EXISTS key
    fn cmd_exists(&self, args: &[String]) -> Reply {
        Reply::flag(self.storage.exists(&args[0]))
    }

    /// EXPIRE key ttlSeconds
    ///
    /// A non-positive ttl expires the key immediately.
    fn cmd_expire(&self, args: &[String]) -> Reply {
        let secs = parse_seconds(&args[1]).max(0) as u64;
        Reply::flag(self.storage.expire(&args[0], Duration::from_secs(secs)))
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[String]) -> Reply {
        Reply::Duration(self.storage.ttl(&args[0]))
    }

    /// PERSIST key
    fn cmd_persist(&self, args: &[String]) -> Reply {
        Reply::flag(self.storage.persist(&args[0]))
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    /// INFO
    fn cmd_info(&self) -> Reply {
        let stats = self.storage.stats();
        Reply::Value(format!(
            "keys={} gets={} sets={} deletes={} expired={}",
            stats.keys, stats.get_ops, stats.set_ops, stats.del_ops, stats.expired
        ))
    }
}

/// Parses a whole number of seconds, treating anything unparsable as 0.
fn parse_seconds(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage)
    }

    fn run(handler: &CommandHandler, line: &str) -> Reply {
        handler
            .execute(&Request::from_line(line))
            .expect("non-empty line gets a reply")
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();
        assert_eq!(run(&handler, "PING"), Reply::Pong);
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(run(&handler, "SET a 1"), Reply::Ok);
        assert_eq!(run(&handler, "GET a"), Reply::Value("1".into()));
    }

    #[test]
    fn test_case_insensitive() {
        let handler = create_handler();

        assert_eq!(run(&handler, "set Key v"), Reply::Ok);
        assert_eq!(run(&handler, "gEt Key"), Reply::Value("v".into()));
        // Keys stay case-sensitive
        assert_eq!(run(&handler, "GET key"), Reply::Nil);
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(run(&handler, "GET missing"), Reply::Nil);
    }

    #[test]
    fn test_blank_line() {
        let handler = create_handler();
        assert_eq!(handler.execute(&Request::from_line("")), None);
        assert_eq!(handler.execute(&Request::from_line("   ")), None);
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        let reply = run(&handler, "FOO bar");
        assert_eq!(reply, Reply::error("unknown command 'FOO'"));
        assert_eq!(reply.to_string(), "ERROR: unknown command 'FOO'");
    }

    #[test]
    fn test_missing_arguments() {
        let handler = create_handler();
        let missing = Reply::from(CommandError::MissingArguments);

        for line in ["SET a", "SET", "GET", "DEL", "EXISTS", "EXPIRE a", "TTL", "PERSIST"] {
            assert_eq!(run(&handler, line), missing, "{}", line);
        }
        assert_eq!(missing.to_string(), "ERROR: missing arguments");
    }

    #[test]
    fn test_del() {
        let handler = create_handler();

        run(&handler, "SET key value");
        assert_eq!(run(&handler, "DEL key"), Reply::Ok);
        assert_eq!(run(&handler, "GET key"), Reply::Nil);
        // Deleting a missing key is still OK
        assert_eq!(run(&handler, "DEL key"), Reply::Ok);
    }

    #[test]
    fn test_exists() {
        let handler = create_handler();

        run(&handler, "SET key1 value1");
        assert_eq!(run(&handler, "EXISTS key1"), Reply::Integer(1));
        assert_eq!(run(&handler, "EXISTS nonexistent"), Reply::Integer(0));
    }

    #[test]
    fn test_set_with_ttl() {
        let handler = create_handler();

        run(&handler, "SET key value 100");
        match run(&handler, "TTL key") {
            Reply::Duration(Some(left)) => {
                assert!(left > Duration::ZERO && left <= Duration::from_secs(100))
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_set_bad_ttl_means_no_expiry() {
        let handler = create_handler();

        for line in ["SET a v abc", "SET a v 0", "SET a v -5"] {
            assert_eq!(run(&handler, line), Reply::Ok);
            assert_eq!(run(&handler, "TTL a"), Reply::Duration(None));
            assert_eq!(run(&handler, "GET a"), Reply::Value("v".into()));
        }
    }

    #[test]
    fn test_expire() {
        let handler = create_handler();

        run(&handler, "SET key value");
        assert_eq!(run(&handler, "TTL key"), Reply::Duration(None));

        assert_eq!(run(&handler, "EXPIRE key 5"), Reply::Integer(1));
        match run(&handler, "TTL key") {
            Reply::Duration(Some(left)) => assert!(left <= Duration::from_secs(5)),
            other => panic!("unexpected reply: {:?}", other),
        }

        assert_eq!(run(&handler, "EXPIRE missing 5"), Reply::Integer(0));
    }

    #[test]
    fn test_expire_bad_ttl_expires_now() {
        let handler = create_handler();

        run(&handler, "SET key value");
        assert_eq!(run(&handler, "EXPIRE key soon"), Reply::Integer(1));
        assert_eq!(run(&handler, "GET key"), Reply::Nil);
        assert_eq!(run(&handler, "EXISTS key"), Reply::Integer(0));
        assert_eq!(run(&handler, "TTL key").to_string(), "-1");
    }

    #[test]
    fn test_huge_ttl_is_accepted() {
        let handler = create_handler();

        assert_eq!(run(&handler, "SET a v 9223372036854775807"), Reply::Ok);
        assert_eq!(run(&handler, "GET a"), Reply::Value("v".into()));
        assert_eq!(run(&handler, "TTL a"), Reply::Duration(None));

        assert_eq!(run(&handler, "EXPIRE a 9223372036854775807"), Reply::Integer(1));
        assert_eq!(run(&handler, "EXISTS a"), Reply::Integer(1));
        assert_eq!(run(&handler, "TTL a"), Reply::Duration(None));
    }

    #[test]
    fn test_persist() {
        let handler = create_handler();

        run(&handler, "SET key value 60");
        assert_eq!(run(&handler, "PERSIST key"), Reply::Integer(1));
        assert_eq!(run(&handler, "TTL key"), Reply::Duration(None));
        assert_eq!(run(&handler, "PERSIST key"), Reply::Integer(0));
    }

    #[test]
    fn test_dbsize_and_info() {
        let handler = create_handler();

        run(&handler, "SET a 1");
        run(&handler, "SET b 2");
        run(&handler, "GET a");
        run(&handler, "DEL b");

        assert_eq!(run(&handler, "DBSIZE"), Reply::Integer(1));
        assert_eq!(
            run(&handler, "INFO"),
            Reply::Value("keys=1 gets=1 sets=2 deletes=1 expired=0".into())
        );
    }

    #[test]
    fn test_lookup() {
        assert_eq!(CommandKind::lookup("quit"), Some(CommandKind::Quit));
        assert_eq!(CommandKind::lookup("Expire"), Some(CommandKind::Expire));
        assert_eq!(CommandKind::lookup("LPUSH"), None);
    }
}
