// Application state module
// Everything a request handler needs, built once at startup

use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::Config;
use crate::error::ConfigError;
use crate::storage::ServedRoot;

/// Application state
pub struct AppState {
    pub config: Config,
    pub root: ServedRoot,
    active_connections: AtomicUsize,
}

impl AppState {
    /// Resolve the served root from `config` and build the state.
    ///
    /// Fails if the root directory does not exist or is not a directory.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let root = ServedRoot::open(&config.storage.root)?;
        Ok(Self {
            config,
            root,
            active_connections: AtomicUsize::new(0),
        })
    }

    /// Try to reserve a connection slot, honoring `performance.max_connections`.
    ///
    /// Returns the number of connections open before this one, or `None`
    /// when the limit has been reached.
    pub fn acquire_connection(&self) -> Option<usize> {
        // Increment first, then check limit (prevents race condition)
        let prev = self.active_connections.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.config.performance.max_connections {
            if prev >= usize::try_from(max).unwrap_or(usize::MAX) {
                self.active_connections.fetch_sub(1, Ordering::SeqCst);
                return None;
            }
        }
        Some(prev)
    }

    pub fn release_connection(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
