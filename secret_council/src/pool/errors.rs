//! Worker pool error types.

use thiserror::Error;

/// Worker pool errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Rejected pool configuration
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The worker owning the session stopped receiving messages
    #[error("Worker is closed")]
    WorkerClosed,

    /// The session finished or was detached
    #[error("Session is closed")]
    SessionClosed,
}
