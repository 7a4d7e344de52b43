//! Error types for the forum data layer.

use forumdb_codec::CodecError;
use forumdb_core::CoreError;
use thiserror::Error;

/// Result type for forum operations.
pub type ForumResult<T> = Result<T, ForumError>;

/// Errors that can occur in forum operations.
#[derive(Debug, Error)]
pub enum ForumError {
    /// Engine error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A stored record could not be decoded.
    #[error("corrupt record {bucket}/{key}: {source}")]
    CorruptRecord {
        /// Bucket holding the record.
        bucket: String,
        /// Key of the record.
        key: String,
        /// Decoding failure.
        #[source]
        source: CodecError,
    },

    /// A record could not be encoded.
    #[error("cannot encode {bucket} record: {source}")]
    Encode {
        /// Bucket the record was destined for.
        bucket: &'static str,
        /// Encoding failure.
        #[source]
        source: CodecError,
    },

    /// No topic is stored under the id.
    #[error("no topic {id}")]
    TopicNotFound {
        /// The topic id.
        id: String,
    },

    /// A topic names a category that does not exist.
    #[error("no category {id}")]
    CategoryNotFound {
        /// The category id.
        id: String,
    },
}

impl ForumError {
    /// Creates a corrupt record error.
    pub fn corrupt(bucket: impl Into<String>, key: impl Into<String>, source: CodecError) -> Self {
        Self::CorruptRecord {
            bucket: bucket.into(),
            key: key.into(),
            source,
        }
    }

    /// Returns true if this error is about stored bytes rather than the
    /// request.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::CorruptRecord { .. } => true,
            Self::Core(err) => err.is_corruption(),
            _ => false,
        }
    }
}
