//! Persistence seams.
//!
//! The engine talks to storage only through these traits. A backend must
//! enforce uniqueness of (learner, word) and report violations as
//! [`StoreError::DuplicateWord`]; the vocabulary service relies on that to
//! resolve concurrent first sightings of the same word.

mod memory;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Book, BookId, GlobalWordStats, Learner, LearnerId, Word, WordId};

pub use memory::MemoryStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait LearnerStore: Send + Sync {
    async fn insert_learner(&self, learner: Learner) -> StoreResult<()>;

    async fn learner(&self, id: LearnerId) -> StoreResult<Option<Learner>>;
}

#[async_trait]
pub trait WordStore: Send + Sync {
    /// Case-insensitive lookup of a learner's word
    async fn find_word(&self, learner_id: LearnerId, word: &str) -> StoreResult<Option<Word>>;

    async fn word(&self, id: WordId) -> StoreResult<Option<Word>>;

    /// Insert a new row; fails with `DuplicateWord` if (learner, word) exists
    async fn insert_word(&self, word: Word) -> StoreResult<()>;

    /// Replace an existing row (last writer wins)
    async fn update_word(&self, word: Word) -> StoreResult<()>;

    async fn words_for_learner(&self, learner_id: LearnerId) -> StoreResult<Vec<Word>>;

    /// Lowercase words the learner has mastered
    async fn mastered_words(&self, learner_id: LearnerId) -> StoreResult<HashSet<String>>;
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn insert_book(&self, book: Book) -> StoreResult<()>;

    async fn book(&self, id: BookId) -> StoreResult<Option<Book>>;

    async fn update_book(&self, book: Book) -> StoreResult<()>;

    /// Returns the removed book, if it existed
    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    async fn books(&self) -> StoreResult<Vec<Book>>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Index rows for the given words; missing words are absent from the map
    async fn stats_for(&self, words: &[String]) -> StoreResult<HashMap<String, GlobalWordStats>>;

    async fn all_stats(&self) -> StoreResult<Vec<GlobalWordStats>>;

    /// Swap in a full recompute of the index
    async fn replace_stats(&self, stats: Vec<GlobalWordStats>) -> StoreResult<()>;
}

/// Everything the engine needs from a backend
pub trait Store: LearnerStore + WordStore + BookStore + StatsStore + 'static {}

impl<T> Store for T where T: LearnerStore + WordStore + BookStore + StatsStore + 'static {}
