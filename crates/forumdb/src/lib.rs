//! # ForumDB
//!
//! A small forum data layer over an embedded, transactional key-value store.
//!
//! Three entity kinds live in three buckets of one store file:
//! - [`Topic`] in `forumTopic`
//! - [`Category`] in `forumCategory`, with the ids of its topics
//! - [`Reply`] in `forumReply`, pointing at its topic
//!
//! Relationships are kept by hand: saving a topic appends it to its
//! category's list in the same transaction, and replies are found by
//! scanning for their `to` field.
//!
//! ```rust,ignore
//! use forumdb::Forum;
//!
//! let forum = Forum::in_memory()?;
//! let mut cat = forum.new_category()?;
//! cat.name = "General".into();
//! cat.save(&forum)?;
//!
//! let mut topic = forum.new_topic()?;
//! topic.category = cat.id().to_string();
//! topic.save(&forum)?;
//!
//! assert_eq!(forum.list_topics_of(cat.id())?.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod facade;
mod forum;
pub mod id;
mod index;
pub mod model;
mod query;

pub use error::{ForumError, ForumResult};
pub use facade::Facade;
pub use forum::{Forum, ForumConfig, BUCKETS};
pub use id::{IdGenerator, IdKind};
pub use index::StaleTopicRef;
pub use model::{Category, Record, Reply, Topic, NO_CATEGORY};
pub use query::ScanReport;

pub use forumdb_core::{Config, CoreError, StatsSnapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
