//! # ForumDB Storage
//!
//! Byte-level storage for the ForumDB commit log.
//!
//! Backends are **opaque append-only byte stores**. They know nothing about
//! buckets, transactions or record framing; `forumdb_core` owns all of that.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and throwaway stores
//! - [`FileBackend`] - For persistent stores backed by a single file
//!
//! ## Example
//!
//! ```rust
//! use forumdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"forumTopic").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"forum");
//! assert_eq!(backend.read_all().unwrap(), b"forumTopic");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
