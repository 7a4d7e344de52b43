//! Random, collision-checked identifiers.
//!
//! Identifiers are drawn from a 17-symbol alphabet and checked against the
//! bucket they will live in. A candidate is rejected only when its key
//! already holds a non-empty value; a key holding an empty value counts as
//! free.
//!
//! The check runs in its own read transaction, separate from the write that
//! later stores the entity.

use crate::error::ForumResult;
use crate::facade::Facade;
use crate::model::{Category, Record, Reply, Topic};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Symbols identifiers are drawn from.
pub const ALPHABET: &[u8] = b"abcdefg1234567890";

/// The entity an identifier is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Topic ids, 64 characters.
    Topic,
    /// Category ids, 32 characters.
    Category,
    /// Reply ids, 64 characters.
    Reply,
}

impl IdKind {
    /// Number of characters in an id of this kind.
    #[must_use]
    pub const fn length(self) -> usize {
        match self {
            Self::Topic | Self::Reply => 64,
            Self::Category => 32,
        }
    }

    /// Bucket the id must be unique in.
    #[must_use]
    pub const fn bucket(self) -> &'static str {
        match self {
            Self::Topic => Topic::BUCKET,
            Self::Category => Category::BUCKET,
            Self::Reply => Reply::BUCKET,
        }
    }
}

/// Generates identifiers that are free in their bucket.
#[derive(Debug)]
pub struct IdGenerator {
    rng: Mutex<StdRng>,
    collisions: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates a generator with a fixed seed, for reproducible ids.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            collisions: AtomicU64::new(0),
        }
    }

    /// Draws `len` random symbols without checking any bucket.
    #[must_use]
    pub fn candidate(&self, len: usize) -> String {
        let mut rng = self.rng.lock();
        (0..len)
            .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }

    /// Returns an id of `kind` that is free in its bucket.
    ///
    /// Retries until a free candidate turns up; each rejected candidate is
    /// counted in [`IdGenerator::collisions`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket cannot be read.
    pub fn generate(&self, facade: &Facade, kind: IdKind) -> ForumResult<String> {
        loop {
            let candidate = self.candidate(kind.length());
            match facade.get(kind.bucket(), &candidate)? {
                Some(existing) if !existing.is_empty() => {
                    self.collisions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(bucket = kind.bucket(), id = %candidate, "id collision, retrying");
                }
                _ => return Ok(candidate),
            }
        }
    }

    /// Number of candidates rejected so far.
    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
