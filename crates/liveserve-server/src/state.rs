//! Application state.
//!
//! Shared, read-only state for all request handlers.

use std::path::PathBuf;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Canonical root directory. Fixed for the lifetime of the server.
    pub(crate) root_dir: PathBuf,
}
