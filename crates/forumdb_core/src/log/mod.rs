//! Commit log for durability and crash recovery.
//!
//! The store file *is* the log. Every committed transaction is appended as
//! its mutation records followed by a `Commit` marker; opening a store
//! replays the log into memory.
//!
//! ## Record Format
//!
//! ```text
//! | magic "FDBL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! ## Recovery Policy
//!
//! - A record cut short at the end of the file is a torn write: it is
//!   discarded and the file is truncated back to the last complete record.
//! - Records of a transaction whose `Commit` marker never made it to disk
//!   are ignored.
//! - CRC mismatches, bad magic, unknown types and malformed payloads are
//!   fatal: the store refuses to open.
//! - A length field no record of its type can have, or one that runs past a
//!   later valid record, is fatal too. Only a genuine tail is ever cut.

mod record;
mod writer;

pub use record::{compute_crc32, LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
pub use writer::{encode_records, CommitLog, LogScan};
