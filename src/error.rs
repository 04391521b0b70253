//! Error types for rupool operations.

use thiserror::Error;

/// Result type alias using [`RupoolError`].
pub type Result<T> = std::result::Result<T, RupoolError>;

/// Error types for rupool operations.
///
/// Recoverable buffer pool conditions (pool exhaustion, unknown pages,
/// over-unpins) are reported through `Option`/`bool` returns on the
/// [`BufferPoolManager`](crate::storage::BufferPoolManager) itself; this enum
/// covers the fallible I/O surface underneath it.
#[derive(Debug, Error)]
pub enum RupoolError {
    /// General storage/I/O error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Buffer pool errors.
    #[error("Buffer pool error: {0}")]
    BufferPoolError(String),
}
