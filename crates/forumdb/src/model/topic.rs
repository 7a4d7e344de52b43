//! Discussion topics.

use crate::error::ForumResult;
use crate::forum::Forum;
use crate::index;
use crate::model::{Record, Reply, NO_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A discussion topic filed under one category.
///
/// Replies are not embedded; they point back at the topic through
/// [`Reply::to`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    id: String,
    /// Id of the user who opened the topic.
    pub owner: String,
    /// Title line.
    pub title: String,
    /// Opening post.
    pub body: String,
    /// Id of the owning category.
    pub category: String,
}

impl Topic {
    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns the topic id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Category key the topic is filed under, with the sentinel standing in
    /// for an empty category.
    #[must_use]
    pub fn category_key(&self) -> &str {
        if self.category.is_empty() {
            NO_CATEGORY
        } else {
            &self.category
        }
    }

    /// Saves the topic and appends its id to its category's topic list.
    ///
    /// Both writes happen in one transaction. The stored record carries
    /// [`Topic::category_key`] as its category.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ForumError::CategoryNotFound`] if the category does
    /// not exist and [`crate::ForumError::CorruptRecord`] if it cannot be
    /// decoded. Nothing is written in either case.
    pub fn save(&self, forum: &Forum) -> ForumResult<()> {
        let category = self.category_key().to_string();
        let stored = Self {
            category,
            ..self.clone()
        };
        let bytes = stored.encode()?;

        forum.facade().update(|tx| {
            index::link_topic(tx, &stored.category, &stored.id)?;
            tx.put(Self::BUCKET, &stored.id, bytes)?;
            Ok(())
        })?;

        tracing::debug!(id = %self.id, category = %stored.category, "topic saved");
        Ok(())
    }

    /// Removes the topic record.
    ///
    /// Its replies and its entry in the category's topic list stay.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    pub fn delete(&self, forum: &Forum) -> ForumResult<()> {
        forum.facade().delete(Self::BUCKET, &self.id)
    }

    /// Creates an unsaved reply to this topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply bucket cannot be read.
    pub fn new_reply(&self, forum: &Forum) -> ForumResult<Reply> {
        forum.new_reply(self)
    }

    /// Returns every reply whose `to` is this topic.
    ///
    /// # Errors
    ///
    /// Returns an error if a reply cannot be decoded.
    pub fn replies(&self, forum: &Forum) -> ForumResult<BTreeMap<String, Reply>> {
        forum.all_replies_of(&self.id)
    }
}

impl Record for Topic {
    const BUCKET: &'static str = "forumTopic";

    fn id(&self) -> &str {
        &self.id
    }
}
