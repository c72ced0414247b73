//! ngramkit RPC Server - JSON-RPC backend for non-Rust query layers.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the ngramkit library, so that
//! services written in other languages can generate n-grams, assemble search data and
//! build dialect-specific SQL fragments with the same rules as Rust callers.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use ngramkit::SearchSettings;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ngramkit-rpc")]
#[command(about = "JSON-RPC server for ngramkit full-text search fragments")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON settings file (defaults to $NGRAMKIT_SETTINGS)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// SQL dialect, overriding settings and $NGRAMKIT_DIALECT
    #[arg(long)]
    dialect: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting ngramkit RPC Server");

    let settings =
        SearchSettings::load(args.settings.as_deref())?.with_dialect_override(args.dialect.as_deref())?;
    info!(
        "Dialect: {}, {} preconfigured record types",
        settings.dialect,
        settings.record_types.len()
    );

    // Start the server
    let addr = server::start_server(settings, &args.host, args.port).await?;

    // Print port for the parent process to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
