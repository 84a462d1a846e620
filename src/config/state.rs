// Application state module
// Shared read-only runtime state derived from the loaded configuration

use std::sync::atomic::AtomicBool;

use super::types::Config;

/// Application state shared across connections
pub struct AppState {
    pub config: Config,
    /// Cached access-log flag for lock-free checks on the request path
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            cached_access_log: AtomicBool::new(config.logging.access_log),
        }
    }
}
