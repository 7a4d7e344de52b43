//! Error types for the ForumDB engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] forumdb_storage::StorageError),

    /// I/O error outside the storage backend (lock file, compaction rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The commit log is malformed.
    #[error("commit log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A commit log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the offending record.
        offset: u64,
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// The named bucket does not exist.
    #[error("bucket not found: {name}")]
    BucketNotFound {
        /// Name of the bucket.
        name: String,
    },

    /// Buckets must have a non-empty name.
    #[error("bucket name required")]
    BucketNameRequired,

    /// Values must be stored under a non-empty key.
    #[error("key required")]
    KeyRequired,

    /// A key, bucket name or value is too large for the log format.
    #[error("{what} too large: {len} bytes exceeds maximum of {max}")]
    TooLarge {
        /// What was too large.
        what: &'static str,
        /// Actual length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Another handle holds the store's lock.
    #[error("store locked: {} is open elsewhere", path.display())]
    StoreLocked {
        /// Path of the store file.
        path: PathBuf,
    },

    /// The store file does not exist and creation was not requested.
    #[error("store does not exist: {}", path.display())]
    StoreNotFound {
        /// Path of the store file.
        path: PathBuf,
    },

    /// The store file exists and `error_if_exists` was requested.
    #[error("store already exists: {}", path.display())]
    StoreExists {
        /// Path of the store file.
        path: PathBuf,
    },

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a bucket not found error.
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound { name: name.into() }
    }

    /// Returns true if this error means the data on disk cannot be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::LogCorruption { .. } | Self::ChecksumMismatch { .. }
        )
    }
}
