//! Server Configuration
//!
//! Configuration comes from command-line flags with defaults matching a
//! local Redis-style setup.

use crate::storage::DEFAULT_SWEEP_INTERVAL;
use std::time::Duration;
use thiserror::Error;

/// The default port LumenKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host LumenKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Interval between expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// What the command line asked the binary to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Start the server with this configuration
    Run(Config),
    /// Print usage and exit
    Help,
    /// Print the version and exit
    Version,
}

/// Errors from parsing command-line flags.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

impl Config {
    /// Parses flags, excluding the program name.
    ///
    /// # Example
    ///
    /// ```
    /// use lumenkv::config::{CliAction, Config};
    ///
    /// let action = Config::from_args(["--port", "7000"]).unwrap();
    /// let CliAction::Run(config) = action else { panic!() };
    /// assert_eq!(config.port, 7000);
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--host" | "-h" => {
                    config.host = next_value(&mut args, &flag)?;
                }
                "--port" | "-p" => {
                    let value = next_value(&mut args, &flag)?;
                    config.port = parse_value(&flag, value)?;
                }
                "--sweep-interval" | "-s" => {
                    let value = next_value(&mut args, &flag)?;
                    let secs: u64 = parse_value(&flag, value.clone())?;
                    if secs == 0 {
                        return Err(ConfigError::InvalidValue { flag, value });
                    }
                    config.sweep_interval = Duration::from_secs(secs);
                }
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                _ => return Err(ConfigError::UnknownArgument(flag)),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

/// Usage text for `--help`.
pub fn help_text() -> &'static str {
    r#"
LumenKV - An In-Memory TTL Cache

USAGE:
    lumenkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 6379)
    -s, --sweep-interval <SECS>    Seconds between expiry sweeps (default: 10)
    -v, --version                  Print version information
        --help                     Print this help message

LOGGING:
    Set RUST_LOG (e.g. RUST_LOG=lumenkv=debug) to change verbosity.

CONNECTING:
    Any line-based TCP client works:
    $ nc 127.0.0.1 6379
    SET name Ariz 60
    OK
    GET name
    Ariz
    TTL name
    59.874s
"#
}
