//! Error types for sweeper operations

use thiserror::Error;
use todo_lifecycle::LifecycleError;

/// Errors that can occur while scheduling sweeps
#[derive(Error, Debug)]
pub enum SweeperError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sweep could not start (candidate query failed)
    #[error("Sweep failed: {0}")]
    Sweep(#[from] LifecycleError),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
