//! Forum entities and their storage encoding.
//!
//! Each entity lives in its own bucket, keyed by its id:
//!
//! | Entity | Bucket | Id length |
//! |---|---|---|
//! | [`Topic`] | `forumTopic` | 64 |
//! | [`Category`] | `forumCategory` | 32 |
//! | [`Reply`] | `forumReply` | 64 |
//!
//! Records are CBOR maps keyed by field name in declaration order.

mod category;
mod reply;
mod topic;

pub use category::Category;
pub use reply::Reply;
pub use topic::Topic;

use crate::error::{ForumError, ForumResult};
use forumdb_codec::{from_cbor, to_cbor};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Category id used when a topic names no category.
pub const NO_CATEGORY: &str = "invalid";

/// A type stored as one record in its own bucket.
///
/// # Example
///
/// ```rust,ignore
/// use forumdb::{Record, Topic};
///
/// let bytes = topic.encode()?;
/// let back = Topic::decode(topic.id(), &bytes)?;
/// assert_eq!(topic, back);
/// ```
pub trait Record: Serialize + DeserializeOwned + Sized {
    /// Bucket holding records of this type.
    const BUCKET: &'static str;

    /// The record's key in [`Record::BUCKET`].
    fn id(&self) -> &str;

    /// Encodes the record.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::Encode`] if serialization fails.
    fn encode(&self) -> ForumResult<Vec<u8>> {
        to_cbor(self).map_err(|source| ForumError::Encode {
            bucket: Self::BUCKET,
            source,
        })
    }

    /// Decodes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if `bytes` is not a valid record.
    fn decode(key: &str, bytes: &[u8]) -> ForumResult<Self> {
        from_cbor(bytes).map_err(|source| ForumError::corrupt(Self::BUCKET, key, source))
    }
}
