//! Test-only store wrapper with switchable statistics-write failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{BookStore, LearnerStore, MemoryStore, StatsStore, StoreResult, WordStore};
use crate::error::StoreError;
use crate::model::{Book, BookId, GlobalWordStats, Learner, LearnerId, Word, WordId};

/// A [`MemoryStore`] whose `replace_stats` fails while the switch is on
#[derive(Default)]
pub(crate) struct FlakyStats {
    inner: MemoryStore,
    fail: AtomicBool,
}

impl FlakyStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail_stats_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LearnerStore for FlakyStats {
    async fn insert_learner(&self, learner: Learner) -> StoreResult<()> {
        self.inner.insert_learner(learner).await
    }
    async fn learner(&self, id: LearnerId) -> StoreResult<Option<Learner>> {
        self.inner.learner(id).await
    }
}

#[async_trait]
impl WordStore for FlakyStats {
    async fn find_word(&self, learner_id: LearnerId, word: &str) -> StoreResult<Option<Word>> {
        self.inner.find_word(learner_id, word).await
    }
    async fn word(&self, id: WordId) -> StoreResult<Option<Word>> {
        self.inner.word(id).await
    }
    async fn insert_word(&self, word: Word) -> StoreResult<()> {
        self.inner.insert_word(word).await
    }
    async fn update_word(&self, word: Word) -> StoreResult<()> {
        self.inner.update_word(word).await
    }
    async fn words_for_learner(&self, learner_id: LearnerId) -> StoreResult<Vec<Word>> {
        self.inner.words_for_learner(learner_id).await
    }
    async fn mastered_words(&self, learner_id: LearnerId) -> StoreResult<HashSet<String>> {
        self.inner.mastered_words(learner_id).await
    }
}

#[async_trait]
impl BookStore for FlakyStats {
    async fn insert_book(&self, book: Book) -> StoreResult<()> {
        self.inner.insert_book(book).await
    }
    async fn book(&self, id: BookId) -> StoreResult<Option<Book>> {
        self.inner.book(id).await
    }
    async fn update_book(&self, book: Book) -> StoreResult<()> {
        self.inner.update_book(book).await
    }
    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        self.inner.delete_book(id).await
    }
    async fn books(&self) -> StoreResult<Vec<Book>> {
        self.inner.books().await
    }
}

#[async_trait]
impl StatsStore for FlakyStats {
    async fn stats_for(&self, words: &[String]) -> StoreResult<HashMap<String, GlobalWordStats>> {
        self.inner.stats_for(words).await
    }
    async fn all_stats(&self) -> StoreResult<Vec<GlobalWordStats>> {
        self.inner.all_stats().await
    }
    async fn replace_stats(&self, stats: Vec<GlobalWordStats>) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("statistics table unavailable".to_string()));
        }
        self.inner.replace_stats(stats).await
    }
}
