//! Bucket-level primitives over the store.
//!
//! Every method runs exactly one engine transaction. Entity code builds on
//! these instead of touching [`Store`] directly.

use crate::error::ForumResult;
use forumdb_core::{ReadTx, Store, TxRead, WriteTx};

/// Get/put/delete/scan over named buckets.
#[derive(Debug)]
pub struct Facade {
    store: Store,
}

impl Facade {
    /// Wraps an open store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Stores `value` under `key`, creating the bucket if needed.
    ///
    /// An empty `key` only creates the bucket. Empty values are stored as-is.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty bucket name or if the commit fails.
    pub fn write(&self, bucket: &str, key: &str, value: &[u8]) -> ForumResult<()> {
        self.update(|tx| {
            tx.create_bucket_if_not_exists(bucket)?;
            if !key.is_empty() {
                tx.put(bucket, key, value.to_vec())?;
            }
            Ok(())
        })
    }

    /// Looks up `key`, treating every failure as absence.
    ///
    /// Returns `None` for an empty bucket name or key, a missing bucket, a
    /// missing key, or an engine error (which is logged).
    pub fn read(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        match self.get(bucket, key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(bucket, key, error = %err, "read failed");
                None
            }
        }
    }

    /// Looks up `key`, separating absence from failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction cannot be started.
    pub fn get(&self, bucket: &str, key: &str) -> ForumResult<Option<Vec<u8>>> {
        if bucket.is_empty() || key.is_empty() {
            return Ok(None);
        }
        self.view(|tx| {
            if !tx.bucket_exists(bucket) {
                return Ok(None);
            }
            Ok(tx.get(bucket, key)?.map(<[u8]>::to_vec))
        })
    }

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`forumdb_core::CoreError::BucketNotFound`] if the bucket does
    /// not exist.
    pub fn delete(&self, bucket: &str, key: &str) -> ForumResult<()> {
        self.update(|tx| Ok(tx.delete(bucket, key)?))
    }

    /// Calls `f` for every pair of `bucket` in key order, creating the
    /// bucket first if needed.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`, or an engine error.
    pub fn scan<F>(&self, bucket: &str, f: F) -> ForumResult<()>
    where
        F: FnMut(&str, &[u8]) -> ForumResult<()>,
    {
        self.store.stats().record_scan();
        self.update(|tx| {
            tx.create_bucket_if_not_exists(bucket)?;
            tx.for_each(bucket, f)
        })
    }

    /// Runs `f` in one read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` (nothing is written) or a commit failure.
    pub fn update<T, F>(&self, f: F) -> ForumResult<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> ForumResult<T>,
    {
        self.store.update(f)
    }

    /// Runs `f` in one read-only transaction.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` or an engine error.
    pub fn view<T, F>(&self, f: F) -> ForumResult<T>
    where
        F: FnOnce(&ReadTx) -> ForumResult<T>,
    {
        self.store.view(f)
    }
}

impl From<Store> for Facade {
    fn from(store: Store) -> Self {
        Self::new(store)
    }
}
