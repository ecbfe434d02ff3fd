//! TCP Server
//!
//! Accepts connections and spawns one [`handle_connection`] task per client,
//! all sharing a single [`StorageEngine`]. The accept loop runs until the
//! shutdown future resolves.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// A configured server: the engine, its sweeper, and connection stats.
pub struct Server {
    config: Config,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Creates the storage engine. Nothing is bound or spawned yet.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            storage: Arc::new(StorageEngine::new()),
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    /// The shared storage engine.
    pub fn storage(&self) -> Arc<StorageEngine> {
        Arc::clone(&self.storage)
    }

    /// The shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    ///
    /// A bind failure is the only error returned.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!("Listening on {}", listener.local_addr()?);
        self.run_with_listener(listener, shutdown).await;
        Ok(())
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// The expiry sweeper lives exactly as long as this call.
    pub async fn run_with_listener(self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        let sweeper = ExpirySweeper::start(
            Arc::clone(&self.storage),
            ExpiryConfig {
                interval: self.config.sweep_interval,
            },
        );

        serve(listener, self.storage, self.stats, shutdown).await;

        sweeper.stop();
    }
}

/// Accepts connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::select! {
        _ = accept_loop(listener, storage, stats) => {}
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
        }
    }
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
