//! Listings and point reads.
//!
//! Listings are full-bucket scans in key order; filters are applied after
//! decoding. The strict listings stop at the first record that fails to
//! decode and return no partial result. [`Forum::scan_lenient`] keeps going
//! and reports failures alongside what it could decode.

use crate::error::{ForumError, ForumResult};
use crate::forum::Forum;
use crate::model::{Category, Record, Reply, Topic};
use std::collections::BTreeMap;

/// Outcome of a lenient scan.
#[derive(Debug)]
pub struct ScanReport<T> {
    /// Records that decoded, by key.
    pub records: BTreeMap<String, T>,
    /// One [`ForumError::CorruptRecord`] per record that did not.
    pub errors: Vec<ForumError>,
}

impl<T> ScanReport<T> {
    /// Returns true if every record decoded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<T> Default for ScanReport<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            errors: Vec::new(),
        }
    }
}

impl Forum {
    /// Scans `T`'s bucket, keeping records for which `keep` is true.
    fn collect<T, P>(&self, mut keep: P) -> ForumResult<BTreeMap<String, T>>
    where
        T: Record,
        P: FnMut(&T) -> bool,
    {
        let mut out = BTreeMap::new();
        self.facade().scan(T::BUCKET, |key, bytes| {
            let record = T::decode(key, bytes)?;
            if keep(&record) {
                out.insert(key.to_string(), record);
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Returns every category, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if any category cannot be
    /// decoded.
    pub fn list_categories(&self) -> ForumResult<BTreeMap<String, Category>> {
        self.collect(|_| true)
    }

    /// Returns every topic, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if any topic cannot be decoded.
    pub fn list_all_topics(&self) -> ForumResult<BTreeMap<String, Topic>> {
        self.collect(|_| true)
    }

    /// Returns the topics whose `category` is `category_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if any topic cannot be decoded.
    pub fn list_topics_of(&self, category_id: &str) -> ForumResult<BTreeMap<String, Topic>> {
        self.collect(|topic: &Topic| topic.category == category_id)
    }

    /// Returns every reply, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if any reply cannot be decoded.
    pub fn list_all_replies(&self) -> ForumResult<BTreeMap<String, Reply>> {
        self.collect(|_| true)
    }

    /// Returns the replies whose `to` is `topic_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if any reply cannot be decoded.
    pub fn all_replies_of(&self, topic_id: &str) -> ForumResult<BTreeMap<String, Reply>> {
        self.collect(|reply: &Reply| reply.to == topic_id)
    }

    /// Decodes every record of `T`'s bucket, collecting failures instead of
    /// stopping at the first one.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bucket cannot be scanned.
    pub fn scan_lenient<T: Record>(&self) -> ForumResult<ScanReport<T>> {
        let mut report = ScanReport::default();
        self.facade().scan(T::BUCKET, |key, bytes| {
            match T::decode(key, bytes) {
                Ok(record) => {
                    report.records.insert(key.to_string(), record);
                }
                Err(err) => {
                    tracing::warn!(bucket = T::BUCKET, key, error = %err, "skipping undecodable record");
                    report.errors.push(err);
                }
            }
            Ok(())
        })?;
        Ok(report)
    }

    /// Reads one topic.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::TopicNotFound`] if no topic has this id and
    /// [`ForumError::CorruptRecord`] if it cannot be decoded.
    pub fn read_topic(&self, id: &str) -> ForumResult<Topic> {
        self.read_record(id)?
            .ok_or_else(|| ForumError::TopicNotFound { id: id.to_string() })
    }

    /// Reads one reply, or `None` if no reply has this id.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if the reply cannot be decoded.
    pub fn read_reply(&self, id: &str) -> ForumResult<Option<Reply>> {
        self.read_record(id)
    }

    /// Reads one category, or `None` if no category has this id.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if the category cannot be
    /// decoded.
    pub fn read_category(&self, id: &str) -> ForumResult<Option<Category>> {
        self.read_record(id)
    }

    fn read_record<T: Record>(&self, id: &str) -> ForumResult<Option<T>> {
        self.facade()
            .get(T::BUCKET, id)?
            .map(|bytes| T::decode(id, &bytes))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forum_with_garbage() -> Forum {
        let forum = Forum::in_memory().unwrap();
        let cat = forum.new_category().unwrap();
        cat.save(&forum).unwrap();
        forum
            .facade()
            .write(Category::BUCKET, "broken", b"\xff\x00")
            .unwrap();
        forum
    }

    #[test]
    fn strict_listing_aborts_on_corruption() {
        let forum = forum_with_garbage();
        let err = forum.list_categories().unwrap_err();
        assert!(matches!(err, ForumError::CorruptRecord { ref key, .. } if key == "broken"));
    }

    #[test]
    fn lenient_scan_reports_corruption() {
        let forum = forum_with_garbage();
        let report = forum.scan_lenient::<Category>().unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn read_reply_absent_and_corrupt() {
        let forum = Forum::in_memory().unwrap();
        assert_eq!(forum.read_reply("missing").unwrap(), None);

        forum.facade().write(Reply::BUCKET, "bad", b"junk").unwrap();
        assert!(forum.read_reply("bad").unwrap_err().is_corruption());
    }

    #[test]
    fn read_topic_absent_and_corrupt() {
        let forum = Forum::in_memory().unwrap();
        assert!(matches!(
            forum.read_topic("missing"),
            Err(ForumError::TopicNotFound { id }) if id == "missing"
        ));

        forum.facade().write(Topic::BUCKET, "bad", b"").unwrap();
        assert!(forum.read_topic("bad").unwrap_err().is_corruption());
    }

    #[test]
    fn empty_buckets_list_empty() {
        let forum = Forum::in_memory().unwrap();
        assert!(forum.list_categories().unwrap().is_empty());
        assert!(forum.list_all_topics().unwrap().is_empty());
        assert!(forum.list_all_replies().unwrap().is_empty());
        assert!(forum.scan_lenient::<Topic>().unwrap().is_clean());
    }
}
