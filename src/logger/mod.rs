//! Logger module
//!
//! Provides logging utilities for the file server:
//! - `tracing` subscriber setup driven by configuration
//! - Access logging with multiple formats
//! - Server lifecycle logging

pub mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Target used for access log lines, e.g. `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `logging.level` is used.
/// Should be called once at application startup.
pub fn init(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, root: &std::path::Path) {
    info!("Serving at http://{addr}");
    info!(root = %root.display(), "Served root");
    info!(
        level = %config.logging.level,
        workers = ?config.server.workers,
        max_body_size = config.http.max_body_size,
        max_connections = ?config.performance.max_connections,
        "Configuration loaded"
    );
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
