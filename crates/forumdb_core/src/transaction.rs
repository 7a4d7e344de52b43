//! Read-only and read-write transactions.
//!
//! - [`ReadTx`] sees an immutable snapshot of committed state taken when it
//!   began; it never blocks and is never blocked by a writer.
//! - [`WriteTx`] holds the store's single writer lock for its lifetime.
//!   Its changes are buffered and only reach the log and the shared state
//!   when [`crate::Store::update`] commits them.

use crate::bucket::BucketMap;
use crate::error::{CoreError, CoreResult};
use crate::log::LogRecord;
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::MutexGuard;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read operations shared by both transaction kinds.
pub trait TxRead {
    /// Returns true if the bucket exists in this transaction's view.
    fn bucket_exists(&self, bucket: &str) -> bool;

    /// Returns the value stored under `key`, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BucketNotFound`] if the bucket does not exist.
    fn get(&self, bucket: &str, key: &str) -> CoreResult<Option<&[u8]>>;

    /// Returns every `(key, value)` pair of the bucket in key order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BucketNotFound`] if the bucket does not exist.
    fn entries(&self, bucket: &str) -> CoreResult<Vec<(&str, &[u8])>>;

    /// Calls `f` for every pair of the bucket in key order, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`, or
    /// [`CoreError::BucketNotFound`].
    fn for_each<E, F>(&self, bucket: &str, mut f: F) -> Result<(), E>
    where
        Self: Sized,
        E: From<CoreError>,
        F: FnMut(&str, &[u8]) -> Result<(), E>,
    {
        for (key, value) in self.entries(bucket)? {
            f(key, value)?;
        }
        Ok(())
    }
}

/// A read-only transaction over a committed snapshot.
#[derive(Debug)]
pub struct ReadTx {
    snapshot: Arc<BucketMap>,
    sequence: SequenceNumber,
}

impl ReadTx {
    pub(crate) fn new(snapshot: Arc<BucketMap>, sequence: SequenceNumber) -> Self {
        Self { snapshot, sequence }
    }

    /// Returns the sequence number of the last commit visible to this
    /// transaction.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Returns the names of all buckets in sorted order.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<&str> {
        self.snapshot.names().collect()
    }

    /// Returns the number of keys in the bucket, or `None` if it is missing.
    #[must_use]
    pub fn len(&self, bucket: &str) -> Option<usize> {
        self.snapshot.bucket(bucket).map(|b| b.len())
    }
}

impl TxRead for ReadTx {
    fn bucket_exists(&self, bucket: &str) -> bool {
        self.snapshot.contains(bucket)
    }

    fn get(&self, bucket: &str, key: &str) -> CoreResult<Option<&[u8]>> {
        let entries = self
            .snapshot
            .bucket(bucket)
            .ok_or_else(|| CoreError::bucket_not_found(bucket))?;
        Ok(entries.get(key).map(Vec::as_slice))
    }

    fn entries(&self, bucket: &str) -> CoreResult<Vec<(&str, &[u8])>> {
        let entries = self
            .snapshot
            .bucket(bucket)
            .ok_or_else(|| CoreError::bucket_not_found(bucket))?;
        Ok(entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect())
    }
}

/// A read-write transaction.
///
/// Reads see the committed snapshot the transaction started from plus the
/// transaction's own uncommitted writes.
pub struct WriteTx<'a> {
    id: TransactionId,
    base: Arc<BucketMap>,
    created: BTreeSet<String>,
    /// bucket -> key -> new value, `None` marking a delete.
    pending: BTreeMap<String, BTreeMap<String, Option<Vec<u8>>>>,
    ops: Vec<LogRecord>,
    guard: MutexGuard<'a, ()>,
}

impl<'a> WriteTx<'a> {
    pub(crate) fn new(id: TransactionId, base: Arc<BucketMap>, guard: MutexGuard<'a, ()>) -> Self {
        Self {
            id,
            base,
            created: BTreeSet::new(),
            pending: BTreeMap::new(),
            ops: Vec::new(),
            guard,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Creates the bucket unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BucketNameRequired`] for an empty name.
    pub fn create_bucket_if_not_exists(&mut self, bucket: &str) -> CoreResult<()> {
        if bucket.is_empty() {
            return Err(CoreError::BucketNameRequired);
        }
        if !self.bucket_exists(bucket) {
            self.created.insert(bucket.to_string());
            self.ops.push(LogRecord::CreateBucket {
                txid: self.id,
                bucket: bucket.to_string(),
            });
        }
        Ok(())
    }

    /// Stores `value` under `key`. Empty values are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BucketNotFound`] if the bucket does not exist and
    /// [`CoreError::KeyRequired`] for an empty key.
    pub fn put(&mut self, bucket: &str, key: &str, value: Vec<u8>) -> CoreResult<()> {
        self.ensure_bucket(bucket)?;
        if key.is_empty() {
            return Err(CoreError::KeyRequired);
        }

        self.pending
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Some(value.clone()));
        self.ops.push(LogRecord::Put {
            txid: self.id,
            bucket: bucket.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BucketNotFound`] if the bucket does not exist.
    pub fn delete(&mut self, bucket: &str, key: &str) -> CoreResult<()> {
        self.ensure_bucket(bucket)?;

        self.pending
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), None);
        self.ops.push(LogRecord::Delete {
            txid: self.id,
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        Ok(())
    }

    /// Returns the number of buffered mutations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.ops.len()
    }

    /// Splits the transaction into its mutation records and the writer lock,
    /// which the caller keeps until the commit is visible.
    pub(crate) fn into_parts(self) -> (Vec<LogRecord>, MutexGuard<'a, ()>) {
        (self.ops, self.guard)
    }

    fn ensure_bucket(&self, bucket: &str) -> CoreResult<()> {
        if self.bucket_exists(bucket) {
            Ok(())
        } else {
            Err(CoreError::bucket_not_found(bucket))
        }
    }
}

impl TxRead for WriteTx<'_> {
    fn bucket_exists(&self, bucket: &str) -> bool {
        self.base.contains(bucket) || self.created.contains(bucket)
    }

    fn get(&self, bucket: &str, key: &str) -> CoreResult<Option<&[u8]>> {
        self.ensure_bucket(bucket)?;

        if let Some(write) = self.pending.get(bucket).and_then(|w| w.get(key)) {
            return Ok(write.as_deref());
        }

        Ok(self
            .base
            .bucket(bucket)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice))
    }

    fn entries(&self, bucket: &str) -> CoreResult<Vec<(&str, &[u8])>> {
        self.ensure_bucket(bucket)?;

        let mut merged: BTreeMap<&str, &[u8]> = self
            .base
            .bucket(bucket)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_slice()))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(writes) = self.pending.get(bucket) {
            for (key, write) in writes {
                match write {
                    Some(value) => {
                        merged.insert(key.as_str(), value.as_slice());
                    }
                    None => {
                        merged.remove(key.as_str());
                    }
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl std::fmt::Debug for WriteTx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTx")
            .field("id", &self.id)
            .field("pending", &self.ops.len())
            .finish_non_exhaustive()
    }
}
