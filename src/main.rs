//! LumenKV - An In-Memory TTL Cache
//!
//! This is the main entry point for the LumenKV server.
//! It parses flags, sets up logging, and runs the server until Ctrl+C.

use lumenkv::config::{help_text, CliAction, Config};
use lumenkv::Server;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
LumenKV v{} - In-Memory TTL Cache
──────────────────────────────────────────────────────────────
Server starting on {}
Expiry sweep every {}s

Use Ctrl+C to shutdown gracefully.
"#,
        lumenkv::VERSION,
        config.bind_address(),
        config.sweep_interval.as_secs()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            println!("{}", help_text());
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("LumenKV version {}", lumenkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", help_text());
            std::process::exit(1);
        }
    };

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    let server = Server::new(config);
    info!("Storage engine initialized");

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run(shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}
