//! Error types for lazarus-reconciler.

use thiserror::Error;

/// Result type for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a reconciliation run.
///
/// Per-attempt failures inside the soft-bootstrap loop are *not* errors at
/// this level: they are logged, counted against the retry budget, and the
/// loop continues. Everything here is fatal to the run.
#[derive(Debug, Error)]
pub enum Error {
    /// The health registry could not provide a trustworthy snapshot.
    #[error("registry error: {0}")]
    Registry(#[from] lazarus_registry::Error),

    /// Database credentials were missing or unreadable.
    #[error("credential error: {0}")]
    Credentials(String),

    /// A database control statement failed. Inside the soft-bootstrap
    /// loop this is caught and counted as a failed attempt.
    #[error("database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// Filesystem failure, e.g. while rewriting the recovery-state marker.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
