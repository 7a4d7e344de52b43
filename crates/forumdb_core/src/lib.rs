//! # ForumDB Core
//!
//! Bucketed, transactional key-value engine for ForumDB.
//!
//! This crate provides:
//! - Named buckets of key-sorted byte values
//! - Serialized read-write transactions and snapshot read-only transactions
//! - A CRC-checked commit log that doubles as the store file
//! - Crash recovery by log replay, and compaction
//! - An exclusive lock file per store

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod config;
mod error;
mod lock;
pub mod log;
mod stats;
mod store;
mod transaction;
mod types;

pub use bucket::{Bucket, BucketMap};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use lock::{lock_path, StoreLock};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::{CompactionStats, LogSummary, RecoverySummary, Store};
pub use transaction::{ReadTx, TxRead, WriteTx};
pub use types::{SequenceNumber, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
