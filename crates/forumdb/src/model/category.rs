//! Categories.

use crate::error::ForumResult;
use crate::forum::Forum;
use crate::model::Record;
use serde::{Deserialize, Serialize};

/// A named group of topics.
///
/// `topics` is kept up to date by [`crate::Topic::save`], which appends the
/// topic's id every time it runs; saving a topic twice lists it twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: String,
    /// Id of the user who created the category.
    pub creator: String,
    /// Display name.
    pub name: String,
    /// Ids of the topics filed here, in save order.
    pub topics: Vec<String>,
}

impl Category {
    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns the category id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Writes the category under its id.
    ///
    /// This overwrites the stored topic list with `self.topics`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn save(&self, forum: &Forum) -> ForumResult<()> {
        forum.facade().write(Self::BUCKET, &self.id, &self.encode()?)
    }

    /// Removes the category record. Topics filed under it are untouched.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    pub fn delete(&self, forum: &Forum) -> ForumResult<()> {
        forum.facade().delete(Self::BUCKET, &self.id)
    }
}

impl Record for Category {
    const BUCKET: &'static str = "forumCategory";

    fn id(&self) -> &str {
        &self.id
    }
}
