//! Store handle, recovery and compaction.

use crate::bucket::BucketMap;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::lock::{sibling_with_suffix, StoreLock};
use crate::log::{encode_records, CommitLog, LogRecord};
use crate::stats::StoreStats;
use crate::transaction::{ReadTx, WriteTx};
use crate::types::{SequenceNumber, TransactionId};
use forumdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An open bucketed key-value store.
///
/// All access goes through transactions:
///
/// ```rust,ignore
/// use forumdb_core::{Store, TxRead};
///
/// let store = Store::open(Path::new("forum.db"))?;
///
/// store.update(|tx| {
///     tx.create_bucket_if_not_exists("forumTopic")?;
///     tx.put("forumTopic", "t1", b"hello".to_vec())
/// })?;
///
/// let value = store.view(|tx| Ok::<_, CoreError>(tx.get("forumTopic", "t1")?.map(<[u8]>::to_vec)))?;
/// store.close()?;
/// ```
///
/// Read-write transactions are serialized. Read-only transactions work on
/// a snapshot and never wait for a writer.
pub struct Store {
    config: Config,
    /// Store file path. None for in-memory stores.
    path: Option<PathBuf>,
    /// Held for the lifetime of the handle.
    _lock: Option<StoreLock>,
    log: CommitLog,
    /// Committed state and the sequence of the commit that produced it.
    state: RwLock<(Arc<BucketMap>, SequenceNumber)>,
    write_lock: Mutex<()>,
    next_txid: AtomicU64,
    stats: StoreStats,
    recovery: RecoverySummary,
    is_open: RwLock<bool>,
}

/// What recovery found in the commit log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Transactions replayed.
    pub transactions: usize,
    /// Complete records ignored because their transaction never committed.
    pub uncommitted_records: usize,
    /// Bytes cut from the end of the log.
    pub truncated_bytes: u64,
}

/// Result of a compaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Log size before compaction.
    pub bytes_before: u64,
    /// Log size after compaction.
    pub bytes_after: u64,
    /// Buckets written to the snapshot.
    pub buckets: usize,
    /// Keys written to the snapshot.
    pub keys: usize,
}

/// Shape of the commit log, as reported by [`Store::log_summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    /// Log size in bytes.
    pub bytes: u64,
    /// Complete records in the log.
    pub records: usize,
    /// Commit markers in the log.
    pub transactions: usize,
    /// Bytes held by superseded committed puts, committed deletes and
    /// records of uncommitted transactions.
    pub reclaimable_bytes: u64,
}

struct Recovered {
    state: BucketMap,
    last_txid: TransactionId,
    last_seq: SequenceNumber,
    summary: RecoverySummary,
}

impl Store {
    /// Opens or creates the store file at `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is locked, the log is corrupt, or I/O
    /// fails.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the store file at `path`.
    ///
    /// The method:
    /// - honours `create_if_missing` and `error_if_exists`
    /// - takes the exclusive `<path>.lock`
    /// - replays the commit log, cutting away a torn tail
    /// - compacts when the log has reached `compact_on_open_bytes`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreNotFound`], [`CoreError::StoreExists`],
    /// [`CoreError::StoreLocked`], a corruption error, or an I/O error.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let exists = path.exists();
        if !exists && !config.create_if_missing {
            return Err(CoreError::StoreNotFound {
                path: path.to_path_buf(),
            });
        }
        if exists && config.error_if_exists {
            return Err(CoreError::StoreExists {
                path: path.to_path_buf(),
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = StoreLock::acquire(path)?;

        // A leftover snapshot from an interrupted compaction was never
        // renamed into place, so the main file is still authoritative.
        let leftover = compaction_path(path);
        if leftover.exists() {
            tracing::warn!(path = %leftover.display(), "removing unfinished compaction file");
            fs::remove_file(&leftover)?;
        }

        let backend = FileBackend::open_with_create_dirs(path)?;
        let threshold = config.compact_on_open_bytes;
        let store = Self::from_backend(config, Some(path.to_path_buf()), Some(lock), Box::new(backend))?;

        if threshold > 0 {
            let size = store.log.size()?;
            if size >= threshold {
                tracing::info!(size, threshold, "log reached compaction threshold");
                store.compact()?;
            }
        }

        tracing::info!(path = %path.display(), seq = %store.committed_seq(), "store opened");
        Ok(store)
    }

    /// Opens an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other constructors.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a store over an arbitrary backend, replaying whatever it holds.
    ///
    /// No lock file is taken and compaction rewrites the backend in place.
    ///
    /// # Errors
    ///
    /// Returns a corruption error if the backend's log cannot be replayed.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        Self::from_backend(config, None, None, backend)
    }

    fn from_backend(
        config: Config,
        path: Option<PathBuf>,
        lock: Option<StoreLock>,
        backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let log = CommitLog::new(backend, config.sync_on_commit);
        let recovered = Self::recover(&log)?;

        if recovered.summary.transactions > 0 || recovered.summary.truncated_bytes > 0 {
            tracing::info!(
                transactions = recovered.summary.transactions,
                uncommitted = recovered.summary.uncommitted_records,
                truncated = recovered.summary.truncated_bytes,
                "recovered commit log"
            );
        }

        Ok(Self {
            config,
            path,
            _lock: lock,
            log,
            state: RwLock::new((Arc::new(recovered.state), recovered.last_seq)),
            write_lock: Mutex::new(()),
            next_txid: AtomicU64::new(recovered.last_txid.as_u64() + 1),
            stats: StoreStats::new(),
            recovery: recovered.summary,
            is_open: RwLock::new(true),
        })
    }

    /// Replays committed transactions into a fresh bucket map.
    ///
    /// Everything after the last commit marker is cut from the log: a torn
    /// record, or whole records of a transaction that never committed.
    fn recover(log: &CommitLog) -> CoreResult<Recovered> {
        let scan = log.scan()?;

        let mut state = BucketMap::new();
        let mut pending: BTreeMap<TransactionId, Vec<LogRecord>> = BTreeMap::new();
        let mut last_txid = TransactionId::default();
        let mut last_seq = SequenceNumber::default();
        let mut committed_end = 0u64;
        let mut summary = RecoverySummary::default();

        for (i, (_, record)) in scan.records.iter().enumerate() {
            let txid = record.txid();
            if txid > last_txid {
                last_txid = txid;
            }

            match record {
                LogRecord::Commit { sequence, .. } => {
                    for op in pending.remove(&txid).unwrap_or_default() {
                        state.apply(&op);
                    }
                    if *sequence > last_seq {
                        last_seq = *sequence;
                    }
                    committed_end = scan
                        .records
                        .get(i + 1)
                        .map_or(scan.valid_len, |(next, _)| *next);
                    summary.transactions += 1;
                }
                op => pending.entry(txid).or_default().push(op.clone()),
            }
        }

        summary.uncommitted_records = pending.values().map(Vec::len).sum();

        let total = scan.valid_len + scan.torn_bytes;
        if committed_end < total {
            summary.truncated_bytes = total - committed_end;
            tracing::warn!(
                offset = committed_end,
                bytes = summary.truncated_bytes,
                torn = scan.torn_bytes,
                "discarding incomplete commit log tail"
            );
            log.truncate(committed_end)?;
        }

        Ok(Recovered {
            state,
            last_txid,
            last_seq,
            summary,
        })
    }

    /// Runs `f` in a read-write transaction.
    ///
    /// If `f` returns `Ok` the transaction's changes are appended to the log
    /// and become visible; if it returns `Err` nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a [`CoreError`] if the commit fails.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<CoreError>,
        F: FnOnce(&mut WriteTx<'_>) -> Result<T, E>,
    {
        self.ensure_open()?;

        let guard = self.write_lock.lock();
        // close() may have finished while this writer waited for the lock.
        self.ensure_open()?;
        let base = Arc::clone(&self.state.read().0);
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        self.stats.record_transaction_start();

        let mut tx = WriteTx::new(txid, base, guard);
        match f(&mut tx) {
            Ok(value) => {
                self.commit(tx)?;
                Ok(value)
            }
            Err(err) => {
                self.stats.record_transaction_rollback();
                tracing::debug!(txid = %txid, "transaction rolled back");
                Err(err)
            }
        }
    }

    fn commit(&self, tx: WriteTx<'_>) -> CoreResult<()> {
        let txid = tx.id();
        let (mut ops, _guard) = tx.into_parts();

        if ops.is_empty() {
            self.stats.record_transaction_commit();
            return Ok(());
        }

        let sequence = self.state.read().1.next();
        ops.push(LogRecord::Commit { txid, sequence });

        let bytes = match self.log.append_transaction(&ops) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.stats.record_error();
                self.stats.record_transaction_rollback();
                tracing::error!(txid = %txid, error = %err, "commit failed");
                return Err(err);
            }
        };

        {
            let mut state = self.state.write();
            let map = Arc::make_mut(&mut state.0);
            for op in &ops {
                map.apply(op);
                match op {
                    LogRecord::Put { .. } => self.stats.record_write(),
                    LogRecord::Delete { .. } => self.stats.record_delete(),
                    _ => {}
                }
            }
            state.1 = sequence;
        }

        self.stats.record_bytes_written(bytes);
        self.stats.record_transaction_commit();
        tracing::debug!(txid = %txid, seq = %sequence, records = ops.len(), bytes, "transaction committed");
        Ok(())
    }

    /// Runs `f` in a read-only transaction.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or [`CoreError::StoreClosed`].
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<CoreError>,
        F: FnOnce(&ReadTx) -> Result<T, E>,
    {
        let tx = self.begin_read()?;
        f(&tx)
    }

    /// Starts a read-only transaction over the current committed state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreClosed`] if the store has been closed.
    pub fn begin_read(&self) -> CoreResult<ReadTx> {
        self.ensure_open()?;
        self.stats.record_read();
        let state = self.state.read();
        Ok(ReadTx::new(Arc::clone(&state.0), state.1))
    }

    /// Rewrites the log as a single transaction holding the live contents.
    ///
    /// File stores write the snapshot to `<path>.compact`, sync it, and
    /// rename it over the store file, so a crash at any point leaves either
    /// the old or the new log intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written or swapped in.
    pub fn compact(&self) -> CoreResult<CompactionStats> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock();
        self.ensure_open()?;

        let bytes_before = self.log.size()?;
        let (snapshot, sequence) = {
            let state = self.state.read();
            (Arc::clone(&state.0), state.1)
        };
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let records = snapshot_records(&snapshot, txid, sequence);

        let result = match &self.path {
            Some(path) => self.compact_file(path, &records),
            None => self.log.rewrite(&records),
        };
        if let Err(err) = result {
            self.stats.record_error();
            tracing::error!(error = %err, "compaction failed");
            return Err(err);
        }

        let stats = CompactionStats {
            bytes_before,
            bytes_after: self.log.size()?,
            buckets: snapshot.names().count(),
            keys: snapshot.key_count(),
        };
        self.stats.record_compaction();
        tracing::info!(
            before = stats.bytes_before,
            after = stats.bytes_after,
            keys = stats.keys,
            "compacted commit log"
        );
        Ok(stats)
    }

    fn compact_file(&self, path: &Path, records: &[LogRecord]) -> CoreResult<()> {
        let tmp = compaction_path(path);
        let written = (|| -> CoreResult<()> {
            let mut backend = FileBackend::open(&tmp)?;
            backend.truncate(0)?;
            backend.append(&encode_records(records)?)?;
            backend.sync()?;
            Ok(())
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        fs::rename(&tmp, path)?;
        sync_parent_dir(path)?;

        let backend = FileBackend::open(path)?;
        self.log.swap_backend(Box::new(backend));
        Ok(())
    }

    /// Scans the log and reports its shape without changing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or is corrupt.
    pub fn log_summary(&self) -> CoreResult<LogSummary> {
        self.ensure_open()?;
        let scan = self.log.scan()?;

        let mut summary = LogSummary {
            bytes: scan.valid_len + scan.torn_bytes,
            records: scan.records.len(),
            ..LogSummary::default()
        };

        let committed: BTreeSet<TransactionId> = scan
            .records
            .iter()
            .filter(|(_, record)| matches!(record, LogRecord::Commit { .. }))
            .map(|(_, record)| record.txid())
            .collect();

        // Walk backwards: the last committed put or delete of a key is live,
        // earlier ones are superseded. Records of uncommitted transactions
        // are never replayed, so all of their bytes count.
        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
        for (i, (offset, record)) in scan.records.iter().enumerate().rev() {
            let end = scan
                .records
                .get(i + 1)
                .map_or(scan.valid_len, |(next, _)| *next);
            if !committed.contains(&record.txid()) {
                summary.reclaimable_bytes += end - offset;
                continue;
            }
            match record {
                LogRecord::Commit { .. } => summary.transactions += 1,
                LogRecord::Put { bucket, key, .. } => {
                    if !seen.insert((bucket.as_str(), key.as_str())) {
                        summary.reclaimable_bytes += end - offset;
                    }
                }
                LogRecord::Delete { bucket, key, .. } => {
                    seen.insert((bucket.as_str(), key.as_str()));
                    summary.reclaimable_bytes += end - offset;
                }
                LogRecord::CreateBucket { .. } => {}
            }
        }

        Ok(summary)
    }

    /// Returns the names of all committed buckets.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<String> {
        self.state.read().0.names().map(str::to_string).collect()
    }

    /// Returns the sequence number of the latest commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.state.read().1
    }

    /// Returns the store's statistics.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Returns what recovery found when the store was opened.
    #[must_use]
    pub fn recovery(&self) -> &RecoverySummary {
        &self.recovery
    }

    /// Returns the store file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Syncs the log and closes the store. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> CoreResult<()> {
        // Same lock order as writers: writer lock first, then the open flag.
        let _guard = self.write_lock.lock();
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.log.sync()?;
        *is_open = false;

        tracing::info!(seq = %self.committed_seq(), "store closed");
        Ok(())
    }

    /// Returns true until [`Store::close`] has been called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::StoreClosed)
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("committed_seq", &self.committed_seq())
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// Records that rebuild `map` as one committed transaction.
fn snapshot_records(map: &BucketMap, txid: TransactionId, sequence: SequenceNumber) -> Vec<LogRecord> {
    let mut records = Vec::new();
    for (name, bucket) in map.iter() {
        records.push(LogRecord::CreateBucket {
            txid,
            bucket: name.to_string(),
        });
        for (key, value) in bucket {
            records.push(LogRecord::Put {
                txid,
                bucket: name.to_string(),
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    records.push(LogRecord::Commit { txid, sequence });
    records
}

fn compaction_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".compact")
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> CoreResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> CoreResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxRead;
    use std::io::{Seek, SeekFrom, Write};
    use tempfile::tempdir;

    fn put(store: &Store, bucket: &str, key: &str, value: &[u8]) {
        store
            .update(|tx| {
                tx.create_bucket_if_not_exists(bucket)?;
                tx.put(bucket, key, value.to_vec())
            })
            .unwrap();
    }

    fn get(store: &Store, bucket: &str, key: &str) -> Option<Vec<u8>> {
        store
            .view(|tx| Ok::<_, CoreError>(tx.get(bucket, key)?.map(<[u8]>::to_vec)))
            .unwrap()
    }

    #[test]
    fn committed_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        {
            let store = Store::open(&path).unwrap();
            put(&store, "forumTopic", "t1", b"hello");
            put(&store, "forumTopic", "t2", b"world");
            store.close().unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(get(&store, "forumTopic", "t1"), Some(b"hello".to_vec()));
        assert_eq!(get(&store, "forumTopic", "t2"), Some(b"world".to_vec()));
        assert_eq!(store.committed_seq(), SequenceNumber::new(2));
    }

    #[test]
    fn failed_update_leaves_no_trace() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "forumTopic", "t1", b"v1");
        let size = store.log.size().unwrap();

        let result: CoreResult<()> = store.update(|tx| {
            tx.put("forumTopic", "t1", b"v2".to_vec())?;
            tx.put("forumTopic", "t2", b"v2".to_vec())?;
            Err(CoreError::KeyRequired)
        });
        assert!(result.is_err());

        assert_eq!(get(&store, "forumTopic", "t1"), Some(b"v1".to_vec()));
        assert_eq!(get(&store, "forumTopic", "t2"), None);
        assert_eq!(store.log.size().unwrap(), size);
        assert_eq!(store.stats().transactions_rolled_back(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "forumReply", "r1", b"old");

        let snapshot = store.begin_read().unwrap();
        put(&store, "forumReply", "r1", b"new");

        assert_eq!(snapshot.get("forumReply", "r1").unwrap(), Some(&b"old"[..]));
        assert_eq!(get(&store, "forumReply", "r1"), Some(b"new".to_vec()));
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        let committed_len = {
            let store = Store::open(&path).unwrap();
            put(&store, "forumTopic", "t1", b"kept");
            store.close().unwrap();
            fs::metadata(&path).unwrap().len()
        };

        // Half of a second transaction.
        let txid = TransactionId::new(99);
        let partial = encode_records(&[LogRecord::Put {
            txid,
            bucket: "forumTopic".into(),
            key: "t2".into(),
            value: b"lost".to_vec(),
        }])
        .unwrap();
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&partial[..partial.len() - 3]).unwrap();
        drop(file);

        let store = Store::open(&path).unwrap();
        assert_eq!(get(&store, "forumTopic", "t1"), Some(b"kept".to_vec()));
        assert_eq!(get(&store, "forumTopic", "t2"), None);
        assert_eq!(store.recovery().truncated_bytes, (partial.len() - 3) as u64);
        store.close().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), committed_len);
    }

    #[test]
    fn uncommitted_records_are_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        {
            let store = Store::open(&path).unwrap();
            put(&store, "forumTopic", "t1", b"kept");
            store.close().unwrap();
        }

        let orphan = encode_records(&[LogRecord::Put {
            txid: TransactionId::new(50),
            bucket: "forumTopic".into(),
            key: "t2".into(),
            value: b"never committed".to_vec(),
        }])
        .unwrap();
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&orphan).unwrap();
        drop(file);

        let store = Store::open(&path).unwrap();
        assert_eq!(get(&store, "forumTopic", "t2"), None);
        assert_eq!(store.recovery().uncommitted_records, 1);
        assert_eq!(store.recovery().truncated_bytes, orphan.len() as u64);

        put(&store, "forumTopic", "t3", b"after");
        store.close().unwrap();
        let store = Store::open(&path).unwrap();
        assert_eq!(get(&store, "forumTopic", "t3"), Some(b"after".to_vec()));
        assert_eq!(get(&store, "forumTopic", "t2"), None);
    }

    #[test]
    fn checksum_corruption_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        {
            let store = Store::open(&path).unwrap();
            put(&store, "forumTopic", "t1", b"payload");
            store.close().unwrap();
        }

        // Flip a byte inside the first record's payload.
        let mut file = fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(12)).unwrap();
        file.write_all(&[0xFF]).unwrap();
        drop(file);

        let err = Store::open(&path).unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[test]
    fn length_corruption_is_rejected_without_truncating() {
        // Offset 10 is the high length byte of the leading CreateBucket
        // record; 44 is a length byte of the Put that follows it.
        for (offset, byte) in [(10u64, 0x7Fu8), (44, 0x10)] {
            let dir = tempdir().unwrap();
            let path = dir.path().join("forum.db");

            {
                let store = Store::open(&path).unwrap();
                for key in ["t1", "t2", "t3"] {
                    put(&store, "forumTopic", key, b"payload");
                }
                store.close().unwrap();
            }
            let before = fs::metadata(&path).unwrap().len();

            let mut file = fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(offset)).unwrap();
            file.write_all(&[byte]).unwrap();
            drop(file);

            let err = Store::open(&path).unwrap_err();
            assert!(err.is_corruption(), "offset {offset}: unexpected error: {err}");
            assert_eq!(fs::metadata(&path).unwrap().len(), before);
        }
    }

    #[test]
    fn writer_waiting_on_close_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "forumTopic", "t1", b"payload");
        let size = store.log.size().unwrap();

        let guard = store.write_lock.lock();
        std::thread::scope(|s| {
            let writer = s.spawn(|| {
                store.update(|tx| tx.put("forumTopic", "t2", b"late".to_vec()))
            });
            std::thread::sleep(std::time::Duration::from_millis(50));
            *store.is_open.write() = false;
            drop(guard);

            let result = writer.join().unwrap();
            assert!(matches!(result, Err(CoreError::StoreClosed)));
        });
        assert_eq!(store.log.size().unwrap(), size);
    }

    #[test]
    fn log_summary_counts_uncommitted_records_as_reclaimable() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "forumTopic", "t1", b"payload");
        assert_eq!(store.log_summary().unwrap().reclaimable_bytes, 0);

        let before = store.log.size().unwrap();
        let stray = [LogRecord::Put {
            txid: TransactionId::new(99),
            bucket: "forumTopic".into(),
            key: "t1".into(),
            value: b"never committed".to_vec(),
        }];
        let bytes = store.log.append_transaction(&stray).unwrap();
        assert_eq!(store.log.size().unwrap(), before + bytes);

        let summary = store.log_summary().unwrap();
        assert_eq!(summary.transactions, 1);
        assert_eq!(summary.reclaimable_bytes, bytes);
    }

    #[test]
    fn compaction_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        let store = Store::open(&path).unwrap();
        for i in 0..10 {
            put(&store, "forumReply", "r1", format!("v{i}").as_bytes());
        }
        put(&store, "forumReply", "r2", b"gone");
        store.update(|tx| tx.delete("forumReply", "r2")).unwrap();

        let summary = store.log_summary().unwrap();
        assert_eq!(summary.transactions, 12);
        assert!(summary.reclaimable_bytes > 0);

        let stats = store.compact().unwrap();
        assert!(stats.bytes_after < stats.bytes_before);
        assert_eq!(stats.keys, 1);
        assert_eq!(store.log_summary().unwrap().transactions, 1);
        assert_eq!(store.log_summary().unwrap().reclaimable_bytes, 0);

        // Writes after compaction go to the new file.
        put(&store, "forumReply", "r3", b"later");
        let seq = store.committed_seq();
        store.close().unwrap();
        drop(store);

        let store = Store::open(&path).unwrap();
        assert_eq!(get(&store, "forumReply", "r1"), Some(b"v9".to_vec()));
        assert_eq!(get(&store, "forumReply", "r2"), None);
        assert_eq!(get(&store, "forumReply", "r3"), Some(b"later".to_vec()));
        assert_eq!(store.committed_seq(), seq);
    }

    #[test]
    fn in_memory_compaction() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "forumCategory", "c1", b"a");
        put(&store, "forumCategory", "c1", b"b");
        store.compact().unwrap();
        assert_eq!(get(&store, "forumCategory", "c1"), Some(b"b".to_vec()));
        assert_eq!(store.stats().compactions(), 1);
    }

    #[test]
    fn compact_on_open_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        {
            let store = Store::open(&path).unwrap();
            for i in 0..20 {
                put(&store, "forumTopic", "t1", format!("{i}").as_bytes());
            }
            store.close().unwrap();
        }
        let before = fs::metadata(&path).unwrap().len();

        let store = Store::open_with_config(&path, Config::new().compact_on_open_bytes(1)).unwrap();
        assert!(store.log.size().unwrap() < before);
        assert_eq!(get(&store, "forumTopic", "t1"), Some(b"19".to_vec()));
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        let store = Store::open(&path).unwrap();
        assert!(matches!(
            Store::open(&path),
            Err(CoreError::StoreLocked { .. })
        ));
        drop(store);
        assert!(Store::open(&path).is_ok());
    }

    #[test]
    fn open_respects_existence_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forum.db");

        assert!(matches!(
            Store::open_with_config(&path, Config::new().create_if_missing(false)),
            Err(CoreError::StoreNotFound { .. })
        ));

        drop(Store::open(&path).unwrap());
        assert!(matches!(
            Store::open_with_config(&path, Config::new().error_if_exists(true)),
            Err(CoreError::StoreExists { .. })
        ));
    }

    #[test]
    fn closed_store_rejects_transactions() {
        let store = Store::open_in_memory().unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());

        let result: CoreResult<()> = store.update(|_| Ok(()));
        assert!(matches!(result, Err(CoreError::StoreClosed)));
        assert!(matches!(store.begin_read(), Err(CoreError::StoreClosed)));
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        use std::thread;

        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .update(|tx| tx.create_bucket_if_not_exists("counter"))
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update(|tx| {
                                let n = tx
                                    .get("counter", "n")?
                                    .map_or(0, |v| u32::from_le_bytes(v.try_into().unwrap_or([0; 4])));
                                tx.put("counter", "n", (n + 1).to_le_bytes().to_vec())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let n = get(&store, "counter", "n").unwrap();
        assert_eq!(u32::from_le_bytes(n.try_into().unwrap()), 100);
    }
}
