//! Book readiness and practice prioritization.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::model::{Book, BookId, BookReadiness, GlobalWordStats, Learner, LearnerId, PrioritizedWord};
use crate::store::Store;

/// Unique lowercase words of a book, in list order
fn unique_words(book: &Book) -> Vec<String> {
    let mut seen = HashSet::new();
    book.words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty() && seen.insert(w.clone()))
        .collect()
}

/// Readiness of one book against a mastered-word set
pub fn book_readiness(book: &Book, mastered: &HashSet<String>, threshold: u8) -> BookReadiness {
    let words = unique_words(book);
    let total_count = words.len();
    let mastered_count = words.iter().filter(|w| mastered.contains(*w)).count();

    let percent = if total_count == 0 {
        0
    } else {
        (mastered_count as f64 / total_count as f64 * 100.0).round() as u8
    };

    BookReadiness {
        book_id: book.id,
        title: book.title.clone(),
        mastered_count,
        total_count,
        percent,
        is_ready: percent >= threshold,
    }
}

/// Descending leverage, then alphabetical
fn by_leverage(a: &PrioritizedWord, b: &PrioritizedWord) -> Ordering {
    b.leverage_score
        .cmp(&a.leverage_score)
        .then_with(|| a.word.cmp(&b.word))
}

/// Rank a book's unmastered words by leverage.
///
/// Words missing from `stats` default to leverage 0 seen once in one book.
pub fn rank_words(
    book: &Book,
    mastered: &HashSet<String>,
    stats: &HashMap<String, GlobalWordStats>,
) -> Vec<PrioritizedWord> {
    let mut ranked: Vec<PrioritizedWord> = unique_words(book)
        .into_iter()
        .filter(|w| !mastered.contains(w))
        .map(|word| match stats.get(&word) {
            Some(s) => PrioritizedWord {
                word,
                leverage_score: s.leverage_score,
                book_count: s.book_count,
                total_occurrences: s.total_occurrences,
            },
            None => PrioritizedWord {
                word,
                leverage_score: 0,
                book_count: 1,
                total_occurrences: 1,
            },
        })
        .collect();
    ranked.sort_by(by_leverage);
    ranked
}

/// Store-backed readiness queries
pub struct ReadinessEngine<S> {
    store: Arc<S>,
    threshold: u8,
}

impl<S: Store> ReadinessEngine<S> {
    pub fn new(store: Arc<S>, threshold: u8) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    async fn learner(&self, learner_id: LearnerId) -> Result<Learner> {
        self.store
            .learner(learner_id)
            .await?
            .ok_or(EngineError::LearnerNotFound(learner_id))
    }

    async fn book(&self, book_id: BookId) -> Result<Book> {
        self.store
            .book(book_id)
            .await?
            .ok_or(EngineError::BookNotFound(book_id))
    }

    /// One entry per book in the corpus, most-ready first
    pub async fn readiness(&self, learner_id: LearnerId) -> Result<Vec<BookReadiness>> {
        self.learner(learner_id).await?;
        let mastered = self.store.mastered_words(learner_id).await?;
        let books = self.store.books().await?;

        let mut entries: Vec<BookReadiness> = books
            .iter()
            .map(|book| book_readiness(book, &mastered, self.threshold))
            .collect();
        entries.sort_by(|a, b| {
            b.percent
                .cmp(&a.percent)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.book_id.cmp(&b.book_id))
        });
        Ok(entries)
    }

    pub async fn book_readiness(&self, learner_id: LearnerId, book_id: BookId) -> Result<BookReadiness> {
        self.learner(learner_id).await?;
        let book = self.book(book_id).await?;
        let mastered = self.store.mastered_words(learner_id).await?;
        Ok(book_readiness(&book, &mastered, self.threshold))
    }

    /// Unmastered words of a book, highest leverage first.
    ///
    /// An empty result means the learner has mastered the whole book.
    pub async fn prioritized_words(&self, learner_id: LearnerId, book_id: BookId) -> Result<Vec<PrioritizedWord>> {
        self.learner(learner_id).await?;
        let book = self.book(book_id).await?;
        let mastered = self.store.mastered_words(learner_id).await?;

        let remaining: Vec<String> = unique_words(&book)
            .into_iter()
            .filter(|w| !mastered.contains(w))
            .collect();
        if remaining.is_empty() {
            tracing::debug!(learner_id = %learner_id, book_id = %book_id, "Book fully mastered");
            return Ok(Vec::new());
        }

        let stats = self.store.stats_for(&remaining).await?;
        Ok(rank_words(&book, &mastered, &stats))
    }

    /// The first `deck_size` prioritized words
    pub async fn practice_deck(&self, learner_id: LearnerId, book_id: BookId) -> Result<Vec<PrioritizedWord>> {
        let learner = self.learner(learner_id).await?;
        let mut deck = self.prioritized_words(learner_id, book_id).await?;
        deck.truncate(learner.settings.deck_size);
        Ok(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearnerSettings;
    use crate::model::{NewBook, Word, WordStatus};
    use crate::stats::GlobalStatsIndex;
    use crate::store::{BookStore, LearnerStore, MemoryStore, WordStore};
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn book(title: &str, words: &[&str]) -> Book {
        NewBook {
            title: title.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        }
        .into_book(Utc::now())
    }

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    async fn master(store: &MemoryStore, learner: LearnerId, word: &str) {
        let mut row = Word::first_sighting(learner, word, Utc::now());
        row.status = WordStatus::Mastered;
        store.insert_word(row).await.unwrap();
    }

    #[test]
    fn test_nine_of_ten_is_ready() {
        let b = book("Ten", &["a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "i1", "j1"]);
        let r = book_readiness(&b, &set(&["a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "i1"]), 90);
        assert_eq!(r.percent, 90);
        assert!(r.is_ready);
        assert_eq!(r.mastered_count, 9);
        assert_eq!(r.total_count, 10);

        let r = book_readiness(&b, &set(&["a1", "b1"]), 90);
        assert_eq!(r.percent, 20);
        assert!(!r.is_ready);
    }

    #[test]
    fn test_empty_book_is_zero() {
        let r = book_readiness(&book("Blank", &[]), &set(&["cat"]), 90);
        assert_eq!(r.total_count, 0);
        assert_eq!(r.percent, 0);
        assert!(!r.is_ready);
    }

    #[test]
    fn test_missing_stats_default_and_ties_alphabetical() {
        let ranked = rank_words(&book("B", &["moon", "ant", "sun"]), &set(&[]), &HashMap::new());
        let words: Vec<&str> = ranked.iter().map(|p| p.word.as_str()).collect();
        assert_eq!(words, vec!["ant", "moon", "sun"]);
        assert!(ranked.iter().all(|p| p.leverage_score == 0 && p.book_count == 1 && p.total_occurrences == 1));
    }

    #[tokio::test]
    async fn test_prioritized_words_skip_mastered() {
        let store = Arc::new(MemoryStore::new());
        let learner = Learner::new("Ana", LearnerSettings::default());
        let learner_id = learner.id;
        store.insert_learner(learner).await.unwrap();

        store.insert_book(book("A", &["cat", "dog", "sun"])).await.unwrap();
        let b = book("B", &["dog", "sun", "moon"]);
        let b_id = b.id;
        store.insert_book(b).await.unwrap();
        GlobalStatsIndex::new(store.clone()).resync().await.unwrap();
        master(&store, learner_id, "dog").await;

        let engine = ReadinessEngine::new(store.clone(), 90);
        let ranked = engine.prioritized_words(learner_id, b_id).await.unwrap();
        let words: Vec<&str> = ranked.iter().map(|p| p.word.as_str()).collect();
        assert_eq!(words, vec!["sun", "moon"]);
        assert!(ranked[0].leverage_score > ranked[1].leverage_score);

        master(&store, learner_id, "sun").await;
        master(&store, learner_id, "moon").await;
        assert!(engine.prioritized_words(learner_id, b_id).await.unwrap().is_empty());

        let readiness = engine.readiness(learner_id).await.unwrap();
        assert_eq!(readiness.len(), 2);
        assert_eq!(readiness[0].book_id, b_id);
        assert_eq!(readiness[0].percent, 100);
        assert_eq!(readiness[1].percent, 67);
    }

    #[tokio::test]
    async fn test_practice_deck_respects_deck_size() {
        let store = Arc::new(MemoryStore::new());
        let settings = LearnerSettings {
            deck_size: 2,
            ..Default::default()
        };
        let learner = Learner::new("Ben", settings);
        let learner_id = learner.id;
        store.insert_learner(learner).await.unwrap();
        let b = book("Deck", &["red", "blue", "green", "pink"]);
        let b_id = b.id;
        store.insert_book(b).await.unwrap();

        let engine = ReadinessEngine::new(store, 90);
        let deck = engine.practice_deck(learner_id, b_id).await.unwrap();
        assert_eq!(deck.len(), 2);
        assert_eq!(deck[0].word, "blue");
        assert_eq!(deck[1].word, "green");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let learner = Learner::new("Cy", LearnerSettings::default());
        let learner_id = learner.id;
        store.insert_learner(learner).await.unwrap();
        let engine = ReadinessEngine::new(store, 90);

        let err = engine.readiness(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::LearnerNotFound(_)));
        let err = engine.prioritized_words(learner_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::BookNotFound(_)));
    }

    proptest! {
        #[test]
        fn prop_readiness_bounds_and_no_mastered_in_ranking(
            words in prop::collection::vec("[a-f]{2,3}", 0..12),
            mastered in prop::collection::hash_set("[a-f]{2,3}", 0..12),
        ) {
            let refs: Vec<&str> = words.iter().map(String::as_str).collect();
            let b = book("p", &refs);

            let r = book_readiness(&b, &mastered, 90);
            prop_assert!(r.percent <= 100);
            prop_assert_eq!(r.is_ready, r.percent >= 90);
            prop_assert!(r.mastered_count <= r.total_count);

            let ranked = rank_words(&b, &mastered, &HashMap::new());
            prop_assert!(ranked.iter().all(|p| !mastered.contains(&p.word)));
            prop_assert_eq!(ranked.len(), r.total_count - r.mastered_count);
        }
    }
}
