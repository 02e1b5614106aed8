//! In-memory store backed by `tokio::sync::RwLock` maps.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, LearnerStore, StatsStore, StoreResult, WordStore};
use crate::error::StoreError;
use crate::model::{Book, BookId, GlobalWordStats, Learner, LearnerId, Word, WordId, WordStatus};

/// Thread-safe in-memory backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    learners: RwLock<HashMap<LearnerId, Learner>>,
    words: RwLock<WordTable>,
    books: RwLock<HashMap<BookId, Book>>,
    stats: RwLock<HashMap<String, GlobalWordStats>>,
}

#[derive(Default)]
struct WordTable {
    rows: HashMap<WordId, Word>,
    /// Uniqueness index on (learner, lowercase word)
    by_learner: HashMap<(LearnerId, String), WordId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearnerStore for MemoryStore {
    async fn insert_learner(&self, learner: Learner) -> StoreResult<()> {
        let mut learners = self.inner.learners.write().await;
        learners.insert(learner.id, learner);
        Ok(())
    }

    async fn learner(&self, id: LearnerId) -> StoreResult<Option<Learner>> {
        let learners = self.inner.learners.read().await;
        Ok(learners.get(&id).cloned())
    }
}

#[async_trait]
impl WordStore for MemoryStore {
    async fn find_word(&self, learner_id: LearnerId, word: &str) -> StoreResult<Option<Word>> {
        let table = self.inner.words.read().await;
        Ok(table
            .by_learner
            .get(&(learner_id, word.to_lowercase()))
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn word(&self, id: WordId) -> StoreResult<Option<Word>> {
        let table = self.inner.words.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn insert_word(&self, word: Word) -> StoreResult<()> {
        let mut table = self.inner.words.write().await;
        let key = (word.learner_id, word.word.to_lowercase());
        if table.by_learner.contains_key(&key) {
            return Err(StoreError::DuplicateWord {
                learner_id: key.0,
                word: key.1,
            });
        }
        table.by_learner.insert(key, word.id);
        table.rows.insert(word.id, word);
        Ok(())
    }

    async fn update_word(&self, word: Word) -> StoreResult<()> {
        let mut table = self.inner.words.write().await;
        match table.rows.get_mut(&word.id) {
            Some(row) => {
                *row = word;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("word {}", word.id))),
        }
    }

    async fn words_for_learner(&self, learner_id: LearnerId) -> StoreResult<Vec<Word>> {
        let table = self.inner.words.read().await;
        Ok(table
            .rows
            .values()
            .filter(|w| w.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn mastered_words(&self, learner_id: LearnerId) -> StoreResult<HashSet<String>> {
        let table = self.inner.words.read().await;
        Ok(table
            .rows
            .values()
            .filter(|w| w.learner_id == learner_id && w.status == WordStatus::Mastered)
            .map(|w| w.word.to_lowercase())
            .collect())
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn insert_book(&self, book: Book) -> StoreResult<()> {
        let mut books = self.inner.books.write().await;
        books.insert(book.id, book);
        Ok(())
    }

    async fn book(&self, id: BookId) -> StoreResult<Option<Book>> {
        let books = self.inner.books.read().await;
        Ok(books.get(&id).cloned())
    }

    async fn update_book(&self, book: Book) -> StoreResult<()> {
        let mut books = self.inner.books.write().await;
        match books.get_mut(&book.id) {
            Some(row) => {
                *row = book;
                Ok(())
            }
            None => Err(StoreError::Missing(format!("book {}", book.id))),
        }
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        let mut books = self.inner.books.write().await;
        Ok(books.remove(&id))
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        let books = self.inner.books.read().await;
        Ok(books.values().cloned().collect())
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn stats_for(&self, words: &[String]) -> StoreResult<HashMap<String, GlobalWordStats>> {
        let stats = self.inner.stats.read().await;
        Ok(words
            .iter()
            .filter_map(|w| stats.get(w).map(|s| (w.clone(), s.clone())))
            .collect())
    }

    async fn all_stats(&self) -> StoreResult<Vec<GlobalWordStats>> {
        let stats = self.inner.stats.read().await;
        Ok(stats.values().cloned().collect())
    }

    async fn replace_stats(&self, rows: Vec<GlobalWordStats>) -> StoreResult<()> {
        let mut stats = self.inner.stats.write().await;
        *stats = rows.into_iter().map(|s| (s.word.clone(), s)).collect();
        Ok(())
    }
}
