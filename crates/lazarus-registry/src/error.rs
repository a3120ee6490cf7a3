//! Error types for lazarus-registry.

use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting a cluster snapshot.
///
/// All three kinds are fatal to the reconciliation run that hit them:
/// recovery must never proceed on untrustworthy input.
#[derive(Debug, Error)]
pub enum Error {
    /// The health registry could not be reached at all.
    #[error("health registry unreachable: {0}")]
    Unreachable(String),

    /// A registry request did not complete within the configured timeout.
    #[error("health registry timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The registry answered, but the payload could not be interpreted.
    ///
    /// Covers HTTP error statuses, bad JSON, unparseable progress output,
    /// and an inconsistent read where no unique bootstrap node resolves.
    #[error("malformed registry response: {0}")]
    Malformed(String),
}
