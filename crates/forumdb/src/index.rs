//! Category to topic-id index.
//!
//! The only relationship stored on both sides is category membership: each
//! topic names its category, and each category lists its topics. The list
//! is append-only. Deleting a topic leaves its id behind; use
//! [`Forum::stale_topic_refs`] to find such entries.

use crate::error::{ForumError, ForumResult};
use crate::forum::Forum;
use crate::model::{Category, Record, Topic};
use forumdb_core::{TxRead, WriteTx};

/// A category entry naming a topic that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleTopicRef {
    /// The category holding the entry.
    pub category: String,
    /// The missing topic's id.
    pub topic: String,
}

/// Appends `topic_id` to the topic list of `category_id` inside `tx`.
pub(crate) fn link_topic(tx: &mut WriteTx<'_>, category_id: &str, topic_id: &str) -> ForumResult<()> {
    let bytes = tx
        .get(Category::BUCKET, category_id)?
        .ok_or_else(|| ForumError::CategoryNotFound {
            id: category_id.to_string(),
        })?;

    let mut category = Category::decode(category_id, bytes)?;
    category.topics.push(topic_id.to_string());
    let updated = category.encode()?;

    tx.put(Category::BUCKET, category_id, updated)?;
    Ok(())
}

impl Forum {
    /// Lists category entries whose topic record is gone.
    ///
    /// Read-only; nothing is repaired.
    ///
    /// # Errors
    ///
    /// Returns [`ForumError::CorruptRecord`] if a category cannot be decoded.
    pub fn stale_topic_refs(&self) -> ForumResult<Vec<StaleTopicRef>> {
        self.facade().view(|tx| {
            let mut stale = Vec::new();
            for (key, bytes) in tx.entries(Category::BUCKET)? {
                let category = Category::decode(key, bytes)?;
                for topic in &category.topics {
                    if tx.get(Topic::BUCKET, topic)?.is_none() {
                        stale.push(StaleTopicRef {
                            category: key.to_string(),
                            topic: topic.clone(),
                        });
                    }
                }
            }
            Ok(stale)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_appends_without_dedup() {
        let forum = Forum::in_memory().unwrap();
        let cat = forum.new_category().unwrap();
        cat.save(&forum).unwrap();

        for _ in 0..2 {
            forum
                .facade()
                .update(|tx| link_topic(tx, cat.id(), "t1"))
                .unwrap();
        }
        let stored = forum.read_category(cat.id()).unwrap().unwrap();
        assert_eq!(stored.topics, ["t1", "t1"]);
    }

    #[test]
    fn link_to_missing_category_fails() {
        let forum = Forum::in_memory().unwrap();
        let result = forum.facade().update(|tx| link_topic(tx, "nope", "t1"));
        assert!(matches!(result, Err(ForumError::CategoryNotFound { id }) if id == "nope"));
    }

    #[test]
    fn stale_refs_after_topic_delete() {
        let forum = Forum::in_memory().unwrap();
        let cat = forum.new_category().unwrap();
        cat.save(&forum).unwrap();

        let mut kept = forum.new_topic().unwrap();
        kept.category = cat.id().to_string();
        kept.save(&forum).unwrap();

        let mut gone = forum.new_topic().unwrap();
        gone.category = cat.id().to_string();
        gone.save(&forum).unwrap();
        gone.delete(&forum).unwrap();

        assert_eq!(
            forum.stale_topic_refs().unwrap(),
            [StaleTopicRef {
                category: cat.id().to_string(),
                topic: gone.id().to_string(),
            }]
        );
    }
}
