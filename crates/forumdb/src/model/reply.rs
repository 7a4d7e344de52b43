//! Replies.

use crate::error::ForumResult;
use crate::forum::Forum;
use crate::model::Record;
use serde::{Deserialize, Serialize};

/// A reply to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    id: String,
    /// Id of the topic answered.
    pub to: String,
    /// Id of the user who replied.
    pub owner: String,
    /// Reply text.
    pub body: String,
}

impl Reply {
    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns the reply id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Writes the reply under its id.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn save(&self, forum: &Forum) -> ForumResult<()> {
        forum.facade().write(Self::BUCKET, &self.id, &self.encode()?)
    }

    /// Removes the reply record.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    pub fn delete(&self, forum: &Forum) -> ForumResult<()> {
        forum.facade().delete(Self::BUCKET, &self.id)
    }
}

impl Record for Reply {
    const BUCKET: &'static str = "forumReply";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let reply = Reply {
            id: "r1".into(),
            to: "t1".into(),
            owner: "u2".into(),
            body: "Welcome!".into(),
        };
        let back = Reply::decode("r1", &reply.encode().unwrap()).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn empty_value_is_corrupt() {
        assert!(Reply::decode("r1", b"").unwrap_err().is_corruption());
    }
}
