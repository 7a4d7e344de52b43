//! Commit log writer and scanner.

use crate::error::{CoreError, CoreResult};
use crate::log::record::{LogRecord, LOG_MAGIC};
use forumdb_storage::StorageBackend;
use parking_lot::Mutex;

/// Result of reading the whole log.
#[derive(Debug, Default)]
pub struct LogScan {
    /// Every complete record with its offset, in log order.
    pub records: Vec<(u64, LogRecord)>,
    /// Length of the prefix made of complete records.
    pub valid_len: u64,
    /// Bytes after `valid_len` that form an incomplete record.
    pub torn_bytes: u64,
}

/// Append-only log of committed transactions.
///
/// Each commit appends every record of one transaction followed by its
/// `Commit` marker in a single backend write, then flushes (or syncs, when
/// `sync_on_commit` is set) before the commit is acknowledged.
pub struct CommitLog {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl CommitLog {
    /// Creates a log over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends one transaction's records as a single write.
    ///
    /// If the write or flush fails the log is cut back to its previous end so
    /// later commits never follow a partial transaction.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or I/O fails.
    pub fn append_transaction(&self, records: &[LogRecord]) -> CoreResult<u64> {
        let data = encode_records(records)?;

        let mut backend = self.backend.lock();
        let start = backend.size()?;

        let written = backend.append(&data).and_then(|_| {
            if self.sync_on_commit {
                backend.sync()
            } else {
                backend.flush()
            }
        });

        if let Err(err) = written {
            if let Err(truncate_err) = backend.truncate(start) {
                tracing::error!(
                    error = %truncate_err,
                    offset = start,
                    "failed to roll back partial commit"
                );
            }
            return Err(err.into());
        }

        Ok(data.len() as u64)
    }

    /// Reads and decodes every complete record.
    ///
    /// A torn record at the very end is reported through
    /// [`LogScan::torn_bytes`] rather than as an error. An incomplete record
    /// followed by a later valid record is not a torn write but a damaged
    /// length field, and is reported as corruption.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, CRC mismatch or malformed records.
    pub fn scan(&self) -> CoreResult<LogScan> {
        let data = self.backend.lock().read_all()?;
        let mut scan = LogScan::default();
        let mut pos = 0usize;

        while pos < data.len() {
            let offset = pos as u64;
            match LogRecord::decode(&data[pos..], offset)? {
                Some((record, used)) => {
                    scan.records.push((offset, record));
                    pos += used;
                }
                None => {
                    if let Some(later) = find_record_after(&data, pos) {
                        return Err(CoreError::log_corruption(
                            offset,
                            format!("record length runs past the record at offset {later}"),
                        ));
                    }
                    break;
                }
            }
        }

        scan.valid_len = pos as u64;
        scan.torn_bytes = (data.len() - pos) as u64;
        Ok(scan)
    }

    /// Cuts the log to `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the truncation.
    pub fn truncate(&self, len: u64) -> CoreResult<()> {
        self.backend.lock().truncate(len)?;
        Ok(())
    }

    /// Replaces the log contents with `records`, written as one block.
    ///
    /// Used for in-memory stores; file-backed stores go through
    /// [`CommitLog::swap_backend`] so the old log stays intact until the new
    /// one is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or I/O fails.
    pub fn rewrite(&self, records: &[LogRecord]) -> CoreResult<()> {
        let data = encode_records(records)?;

        let mut backend = self.backend.lock();
        backend.truncate(0)?;
        backend.append(&data)?;
        backend.sync()?;
        Ok(())
    }

    /// Swaps in a new backend, typically a freshly compacted file.
    pub fn swap_backend(&self, backend: Box<dyn StorageBackend>) {
        *self.backend.lock() = backend;
    }

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> CoreResult<()> {
        self.backend.lock().sync()?;
        Ok(())
    }

    /// Returns the log size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

/// Returns the offset of the first decodable record starting after `pos`.
fn find_record_after(data: &[u8], pos: usize) -> Option<u64> {
    (pos + 1..data.len())
        .filter(|&i| data[i..].starts_with(&LOG_MAGIC))
        .find(|&i| matches!(LogRecord::decode(&data[i..], i as u64), Ok(Some(_))))
        .map(|i| i as u64)
}

/// Encodes `records` back to back.
///
/// # Errors
///
/// Returns an error if a record cannot be encoded.
pub fn encode_records(records: &[LogRecord]) -> CoreResult<Vec<u8>> {
    let mut data = Vec::new();
    for record in records {
        data.extend_from_slice(&record.encode()?);
    }
    Ok(data)
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}
