//! Engine facade: the operations exposed to an HTTP layer.

use std::sync::Arc;

use serde::Serialize;

use crate::books::{BookAppend, BookService};
use crate::config::{EngineConfig, LearnerSettings};
use crate::error::Result;
use crate::mastery::{PracticeContext, PracticeResult};
use crate::model::{Book, BookId, BookPatch, BookReadiness, Learner, LearnerId, NewBook, PrioritizedWord, Word, WordId};
use crate::normalizer::{NormalizeOptions, NormalizedText, TextNormalizer};
use crate::readiness::ReadinessEngine;
use crate::resync::{ResyncHandle, ResyncWorker};
use crate::stats::{GlobalStatsIndex, ResyncReport};
use crate::store::Store;
use crate::vocabulary::{StatusCounts, VocabularyService};

/// A frequently repeated word in ingested text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatedWord {
    pub word: String,
    pub count: u64,
}

/// Result of ingesting raw text for a learner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub new_words_count: usize,
    pub total_words_count: usize,
    pub top_repeated_words: Vec<RepeatedWord>,
    pub new_words: Vec<String>,
    /// Lines dropped as too sparse to be prose
    pub lines_dropped: usize,
    pub ocr_fixes: u64,
}

pub struct Engine<S> {
    config: EngineConfig,
    store: Arc<S>,
    normalizer: TextNormalizer,
    vocabulary: VocabularyService<S>,
    books: BookService<S>,
    readiness: ReadinessEngine<S>,
    index: GlobalStatsIndex<S>,
    resync: ResyncHandle,
}

impl<S: Store> Engine<S> {
    /// Validate `config`, start the resync worker and queue the startup resync.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        let normalizer = TextNormalizer::new(config.normalizer.clone());
        Self::with_normalizer(store, config, normalizer)
    }

    /// Like [`Engine::start`] with a custom normalizer (e.g. dictionary-backed).
    ///
    /// The normalizer's own config is validated as well; it is the one used
    /// for ingestion.
    pub fn with_normalizer(store: Arc<S>, config: EngineConfig, normalizer: TextNormalizer) -> Result<Self> {
        config.validate()?;
        normalizer.config().validate()?;

        let (resync, _worker) = ResyncWorker::spawn(store.clone(), config.resync.clone());
        resync.request()?;

        tracing::info!(
            readiness_threshold = config.readiness_threshold,
            validation_mode = ?config.normalizer.validation_mode,
            "Vocabulary engine started"
        );

        Ok(Self {
            normalizer,
            vocabulary: VocabularyService::new(store.clone()),
            books: BookService::new(store.clone(), resync.clone()),
            readiness: ReadinessEngine::new(store.clone(), config.readiness_threshold),
            index: GlobalStatsIndex::new(store.clone()),
            resync,
            store,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn resync_handle(&self) -> &ResyncHandle {
        &self.resync
    }

    // ------------------------------------------------------------------
    // Learners and vocabulary
    // ------------------------------------------------------------------

    pub async fn register_learner(&self, name: &str, settings: LearnerSettings) -> Result<Learner> {
        let learner = Learner::new(name, settings);
        self.store.insert_learner(learner.clone()).await?;
        tracing::info!(learner_id = %learner.id, "Registered learner");
        Ok(learner)
    }

    pub async fn learner(&self, learner_id: LearnerId) -> Result<Learner> {
        self.vocabulary.learner(learner_id).await
    }

    /// Clean raw text without touching any learner's vocabulary
    pub fn normalize(&self, raw_text: &str, options: NormalizeOptions) -> NormalizedText {
        self.normalizer.normalize_with(raw_text, options)
    }

    /// Normalize raw OCR text and record its words for the learner
    pub async fn ingest(&self, learner_id: LearnerId, raw_text: &str) -> Result<IngestSummary> {
        let learner = self.learner(learner_id).await?;
        let text = self.normalizer.normalize_with(raw_text, (&learner.settings).into());
        self.ingest_normalized(learner_id, text).await
    }

    /// Multi-page variant of [`Engine::ingest`]; pages are cleaned in parallel
    pub async fn ingest_pages(&self, learner_id: LearnerId, pages: &[String]) -> Result<IngestSummary> {
        let learner = self.learner(learner_id).await?;
        let text = self.normalizer.normalize_pages(pages, (&learner.settings).into());
        self.ingest_normalized(learner_id, text).await
    }

    async fn ingest_normalized(&self, learner_id: LearnerId, text: NormalizedText) -> Result<IngestSummary> {
        let outcome = self.vocabulary.ingest(learner_id, &text.candidate_words).await?;
        let top_repeated_words = text
            .top_repeated_words(self.config.top_repeated_words)
            .into_iter()
            .map(|(word, count)| RepeatedWord { word, count })
            .collect();

        Ok(IngestSummary {
            new_words_count: outcome.new_words.len(),
            total_words_count: outcome.total_words,
            top_repeated_words,
            new_words: outcome.new_words,
            lines_dropped: text.lines_dropped,
            ocr_fixes: text.ocr_fixes,
        })
    }

    pub async fn record_result(&self, word_id: WordId, is_correct: bool, is_review: bool) -> Result<Word> {
        let context = if is_review {
            PracticeContext::Review
        } else {
            PracticeContext::Practice
        };
        let result = if is_correct {
            PracticeResult::correct(context)
        } else {
            PracticeResult::incorrect(context)
        };
        self.vocabulary.record_result(word_id, result).await
    }

    pub async fn force_master(&self, word_id: WordId) -> Result<Word> {
        self.vocabulary.force_master(word_id).await
    }

    pub async fn word(&self, word_id: WordId) -> Result<Word> {
        self.vocabulary.word(word_id).await
    }

    pub async fn words(&self, learner_id: LearnerId) -> Result<Vec<Word>> {
        self.vocabulary.words(learner_id).await
    }

    pub async fn status_counts(&self, learner_id: LearnerId) -> Result<StatusCounts> {
        self.vocabulary.status_counts(learner_id).await
    }

    // ------------------------------------------------------------------
    // Readiness and prioritization
    // ------------------------------------------------------------------

    pub async fn readiness(&self, learner_id: LearnerId) -> Result<Vec<BookReadiness>> {
        self.readiness.readiness(learner_id).await
    }

    pub async fn book_readiness(&self, learner_id: LearnerId, book_id: BookId) -> Result<BookReadiness> {
        self.readiness.book_readiness(learner_id, book_id).await
    }

    pub async fn prioritized_words(&self, learner_id: LearnerId, book_id: BookId) -> Result<Vec<PrioritizedWord>> {
        self.readiness.prioritized_words(learner_id, book_id).await
    }

    pub async fn practice_deck(&self, learner_id: LearnerId, book_id: BookId) -> Result<Vec<PrioritizedWord>> {
        self.readiness.practice_deck(learner_id, book_id).await
    }

    // ------------------------------------------------------------------
    // Books and statistics
    // ------------------------------------------------------------------

    /// Recompute the statistics index now and wait for it
    pub async fn resync_global_stats(&self) -> Result<ResyncReport> {
        self.index.resync().await
    }

    pub async fn book(&self, book_id: BookId) -> Result<Book> {
        self.books.book(book_id).await
    }

    pub async fn books(&self) -> Result<Vec<Book>> {
        self.books.books().await
    }

    pub async fn create_book(&self, new_book: NewBook) -> Result<Book> {
        self.books.create(new_book).await
    }

    pub async fn append_book_words(&self, book_id: BookId, words: &[String]) -> Result<BookAppend> {
        self.books.append_words(book_id, words).await
    }

    /// Normalize scanned page text and append its words to a book
    pub async fn append_book_text(&self, book_id: BookId, raw_text: &str) -> Result<BookAppend> {
        let text = self.normalizer.normalize(raw_text);
        self.books.append_normalized(book_id, &text).await
    }

    pub async fn update_book(&self, book_id: BookId, patch: BookPatch) -> Result<Book> {
        self.books.update(book_id, patch).await
    }

    pub async fn delete_book(&self, book_id: BookId) -> Result<Book> {
        self.books.delete(book_id).await
    }
}
