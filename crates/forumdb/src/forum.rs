//! The forum handle.

use crate::error::ForumResult;
use crate::facade::Facade;
use crate::id::{IdGenerator, IdKind};
use crate::model::{Category, Record, Reply, Topic};
use forumdb_core::{Config, Store};
use forumdb_storage::InMemoryBackend;
use std::path::Path;

/// Buckets created when a forum is opened.
pub const BUCKETS: [&str; 3] = [Topic::BUCKET, Category::BUCKET, Reply::BUCKET];

/// Configuration for opening a forum.
#[derive(Debug, Clone, Default)]
pub struct ForumConfig {
    /// Store configuration.
    pub store: Config,
    /// Fixed seed for the id generator. `None` seeds from OS entropy.
    pub id_seed: Option<u64>,
}

impl ForumConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store configuration.
    #[must_use]
    pub fn store(mut self, store: Config) -> Self {
        self.store = store;
        self
    }

    /// Seeds the id generator for reproducible ids.
    #[must_use]
    pub const fn id_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    fn id_generator(&self) -> IdGenerator {
        self.id_seed
            .map_or_else(IdGenerator::new, IdGenerator::with_seed)
    }
}

/// An open forum: topics, categories and replies in one store.
///
/// ```rust,ignore
/// use forumdb::Forum;
///
/// let forum = Forum::open(Path::new("forum.db"))?;
///
/// let mut general = forum.new_category()?;
/// general.name = "General".into();
/// general.save(&forum)?;
///
/// let mut topic = forum.new_topic()?;
/// topic.title = "Welcome".into();
/// topic.category = general.id().to_string();
/// topic.save(&forum)?;
///
/// let mut reply = topic.new_reply(&forum)?;
/// reply.body = "Thanks!".into();
/// reply.save(&forum)?;
///
/// forum.close()?;
/// ```
#[derive(Debug)]
pub struct Forum {
    facade: Facade,
    ids: IdGenerator,
}

impl Forum {
    /// Opens or creates the forum store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the buckets cannot
    /// be created.
    pub fn open(path: &Path) -> ForumResult<Self> {
        Self::open_with_config(path, ForumConfig::default())
    }

    /// Opens the forum store at `path` with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the buckets cannot
    /// be created.
    pub fn open_with_config(path: &Path, config: ForumConfig) -> ForumResult<Self> {
        let store = Store::open_with_config(path, config.store.clone())?;
        Self::with_store(store, &config)
    }

    /// Opens an empty in-memory forum.
    ///
    /// # Errors
    ///
    /// Returns an error if the buckets cannot be created.
    pub fn in_memory() -> ForumResult<Self> {
        Self::in_memory_with_config(ForumConfig::default())
    }

    /// Opens an empty in-memory forum with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the buckets cannot be created.
    pub fn in_memory_with_config(config: ForumConfig) -> ForumResult<Self> {
        let store = Store::open_with_backend(
            config.store.clone(),
            Box::new(InMemoryBackend::new()),
        )?;
        Self::with_store(store, &config)
    }

    /// Wraps an already open store, creating the forum buckets if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buckets cannot be created.
    pub fn with_store(store: Store, config: &ForumConfig) -> ForumResult<Self> {
        let facade = Facade::new(store);
        for bucket in BUCKETS {
            facade.write(bucket, "", &[])?;
        }
        Ok(Self {
            facade,
            ids: config.id_generator(),
        })
    }

    /// Returns the bucket facade.
    #[must_use]
    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        self.facade.store()
    }

    /// Returns the id generator.
    #[must_use]
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Creates an unsaved topic with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic bucket cannot be read.
    pub fn new_topic(&self) -> ForumResult<Topic> {
        Ok(Topic::with_id(self.ids.generate(&self.facade, IdKind::Topic)?))
    }

    /// Creates an unsaved category with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the category bucket cannot be read.
    pub fn new_category(&self) -> ForumResult<Category> {
        Ok(Category::with_id(
            self.ids.generate(&self.facade, IdKind::Category)?,
        ))
    }

    /// Creates an unsaved reply to `topic` with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply bucket cannot be read.
    pub fn new_reply(&self, topic: &Topic) -> ForumResult<Reply> {
        let mut reply = Reply::with_id(self.ids.generate(&self.facade, IdKind::Reply)?);
        reply.to = topic.id().to_string();
        Ok(reply)
    }

    /// Syncs and closes the store. Later operations fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> ForumResult<()> {
        self.store().close()?;
        Ok(())
    }
}
