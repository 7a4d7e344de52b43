//! In-memory image of committed buckets.

use crate::log::LogRecord;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key-sorted contents of one bucket.
pub type Bucket = BTreeMap<String, Vec<u8>>;

/// All committed buckets, by name.
///
/// Buckets are reference counted so that a commit only copies the buckets
/// it touches while older read snapshots still hold them.
#[derive(Debug, Clone, Default)]
pub struct BucketMap {
    buckets: BTreeMap<String, Arc<Bucket>>,
}

impl BucketMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the bucket exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Returns the bucket's contents.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name).map(Arc::as_ref)
    }

    /// Iterates over bucket names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Iterates over `(name, bucket)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bucket)> {
        self.buckets
            .iter()
            .map(|(name, bucket)| (name.as_str(), bucket.as_ref()))
    }

    /// Applies one mutation record. `Commit` markers are ignored.
    pub fn apply(&mut self, record: &LogRecord) {
        match record {
            LogRecord::CreateBucket { bucket, .. } => {
                self.buckets.entry(bucket.clone()).or_default();
            }
            LogRecord::Put {
                bucket, key, value, ..
            } => {
                let entries = self.buckets.entry(bucket.clone()).or_default();
                Arc::make_mut(entries).insert(key.clone(), value.clone());
            }
            LogRecord::Delete { bucket, key, .. } => {
                if let Some(entries) = self.buckets.get_mut(bucket) {
                    if entries.contains_key(key) {
                        Arc::make_mut(entries).remove(key);
                    }
                }
            }
            LogRecord::Commit { .. } => {}
        }
    }

    /// Total number of keys across all buckets.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }
}
