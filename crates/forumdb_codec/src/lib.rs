//! # ForumDB Codec
//!
//! Record encoding for ForumDB buckets.
//!
//! Records are serialized as CBOR maps keyed by field name, in the order the
//! fields are declared on the Rust struct. Decoding is strict: empty input
//! and trailing bytes are both rejected, so a value that decodes is exactly
//! one well-formed record.
//!
//! ## Usage
//!
//! ```
//! use forumdb_codec::{from_cbor, to_cbor};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Category {
//!     id: String,
//!     name: String,
//!     topics: Vec<String>,
//! }
//!
//! let cat = Category { id: "c1".into(), name: "General".into(), topics: vec![] };
//! let bytes = to_cbor(&cat).unwrap();
//! let back: Category = from_cbor(&bytes).unwrap();
//! assert_eq!(cat, back);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;

pub use error::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes `value` as CBOR.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Decodes exactly one CBOR item from `bytes`.
///
/// # Errors
///
/// Returns [`CodecError::EmptyInput`] for an empty slice,
/// [`CodecError::DecodingFailed`] for malformed or mistyped input and
/// [`CodecError::TrailingBytes`] if data follows the item.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let mut reader = bytes;
    let value = ciborium::de::from_reader(&mut reader)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;

    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: reader.len(),
        });
    }

    Ok(value)
}
