//! Store configuration.

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the store file already exists.
    pub error_if_exists: bool,

    /// Whether to fsync the commit log on every commit (safer but slower).
    ///
    /// When false, commits are flushed to the OS but not forced to media.
    pub sync_on_commit: bool,

    /// Compact the log during open once it reaches this many bytes (0 = never).
    pub compact_on_open_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            sync_on_commit: true,
            compact_on_open_bytes: 0,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the store exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to fsync the log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the log size that triggers compaction on open.
    #[must_use]
    pub const fn compact_on_open_bytes(mut self, bytes: u64) -> Self {
        self.compact_on_open_bytes = bytes;
        self
    }
}
