//! Connection Handler Module
//!
//! This module handles individual client connections to LumenKV.
//! Each client gets its own handler task that runs in a loop,
//! reading request lines and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read bytes from socket      │
//!    │  Split off complete lines    │
//!    │  Execute command             │
//!    │  Send reply                  │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / QUIT / error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! Incoming data accumulates in a BytesMut buffer. TCP is a stream protocol,
//! so one read may carry half a line or several lines at once.

use crate::commands::{CommandHandler, CommandKind};
use crate::protocol::{LineParser, ParseError, Reply, Request};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the byte stream so the same loop serves a `TcpStream`
/// in production and an in-memory mock in tests.
pub struct ConnectionHandler<S> {
    /// The client stream, buffered for writes
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Line parser
    parser: LineParser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: LineParser::new(),
            stats,
        }
    }

    /// Replaces the line parser, e.g. to use a different line length limit.
    pub fn with_parser(mut self, parser: LineParser) -> Self {
        self.parser = parser;
        self
    }

    /// Runs the main connection loop.
    ///
    /// This method reads commands from the client, executes them,
    /// and sends back replies until the client disconnects, sends QUIT,
    /// or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(request) = self.try_parse_request()? {
                let Some(reply) = self.command_handler.execute(&request) else {
                    // Blank line: no reply
                    continue;
                };
                self.stats.command_processed();
                if reply.is_error() {
                    debug!(client = %self.addr, reply = %reply, "Command rejected");
                }
                self.send_reply(&reply).await?;

                if is_quit(&request) {
                    return Ok(());
                }
            }

            self.read_more_data().await?;
        }
    }

    /// Attempts to split one request line off the front of the buffer.
    fn try_parse_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        match self.parser.parse(&self.buffer)? {
            Some((request, consumed)) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request"
                );
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Connection closed by client; a trailing unterminated line is dropped
            if !self.buffer.is_empty() {
                debug!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Discarding unterminated line"
                );
            }
            return Err(ConnectionError::ClientDisconnected);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a reply to the client.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent reply"
        );
        Ok(())
    }
}

fn is_quit(request: &Request) -> bool {
    request
        .name()
        .and_then(CommandKind::lookup)
        .is_some_and(|kind| kind == CommandKind::Quit)
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Request line could not be framed
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    // Already logged by `run`
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn mock_handler(
        mock: tokio_test::io::Mock,
    ) -> (ConnectionHandler<tokio_test::io::Mock>, Arc<StorageEngine>) {
        let storage = Arc::new(StorageEngine::new());
        let handler = ConnectionHandler::new(
            mock,
            test_addr(),
            CommandHandler::new(Arc::clone(&storage)),
            Arc::new(ConnectionStats::new()),
        );
        (handler, storage)
    }

    async fn create_test_server() -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());

        let storage_clone = Arc::clone(&storage);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&storage_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler, stats));
            }
        });

        (addr, storage, stats)
    }

    #[tokio::test]
    async fn test_mock_session() {
        let mock = tokio_test::io::Builder::new()
            .read(b"SET a 1\n")
            .write(b"OK\n")
            .read(b"GET a\n")
            .write(b"1\n")
            .build();
        let (handler, storage) = mock_handler(mock);

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(storage.get("a"), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_mock_split_and_batched_lines() {
        let mock = tokio_test::io::Builder::new()
            .read(b"SET k ")
            .read(b"v\n\nGET k\r\nGET nope\n")
            .write(b"OK\n")
            .write(b"v\n")
            .write(b"(nil)\n")
            .build();
        let (handler, _) = mock_handler(mock);

        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_mock_quit() {
        let mock = tokio_test::io::Builder::new()
            .read(b"quit\nSET never 1\n")
            .write(b"OK\n")
            .build();
        let (handler, storage) = mock_handler(mock);

        assert!(handler.run().await.is_ok());
        assert!(!storage.exists("never"));
    }

    #[tokio::test]
    async fn test_mock_line_too_long() {
        let mock = tokio_test::io::Builder::new()
            .read(b"GET aaaaaaaaaaaaaaaa")
            .build();
        let (handler, _) = mock_handler(mock);
        let handler = handler.with_parser(LineParser::with_max_line_length(8));

        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ParseError(ParseError::LineTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_handle_connection_after_error() {
        let mock = tokio_test::io::Builder::new()
            .read(b"PING\n")
            .write(b"PONG\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());

        handle_connection(mock, test_addr(), CommandHandler::new(storage), Arc::clone(&stats)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_set_get() {
        let (addr, _, _) = create_test_server().await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"SET name Ariz\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "OK");

        write_half.write_all(b"GET name\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "Ariz");
    }

    #[tokio::test]
    async fn test_errors_keep_connection_open() {
        let (addr, _, _) = create_test_server().await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"FOO\n").await.unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "ERROR: unknown command 'FOO'"
        );

        write_half.write_all(b"SET a\n").await.unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "ERROR: missing arguments"
        );

        write_half.write_all(b"PING\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "PONG");
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"PING\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PONG\n");

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 5);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 5);

        // Close connection
        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
