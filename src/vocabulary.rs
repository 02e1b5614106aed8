//! Per-learner vocabulary: ingestion and practice results.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{EngineError, Result, StoreError};
use crate::mastery::{self, MasteryRules, PracticeResult};
use crate::model::{Learner, LearnerId, Word, WordId, WordStatus};
use crate::store::Store;

/// Result of ingesting a batch of candidate words
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// Words seen by this learner for the first time, in input order
    pub new_words: Vec<String>,
    /// Distinct candidate words processed
    pub total_words: usize,
}

/// Number of a learner's words in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub new: usize,
    pub learning: usize,
    pub mastered: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.new + self.learning + self.mastered
    }
}

/// Word upserts and mastery transitions over a [`Store`]
pub struct VocabularyService<S> {
    store: Arc<S>,
}

impl<S: Store> VocabularyService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn learner(&self, learner_id: LearnerId) -> Result<Learner> {
        self.store
            .learner(learner_id)
            .await?
            .ok_or(EngineError::LearnerNotFound(learner_id))
    }

    /// Record one sighting of each distinct candidate word.
    ///
    /// New words are created with status `new`; known words get their
    /// occurrence and session counters bumped and keep their status.
    pub async fn ingest(&self, learner_id: LearnerId, candidates: &[String]) -> Result<IngestOutcome> {
        self.learner(learner_id).await?;

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut outcome = IngestOutcome::default();

        for raw in candidates {
            let word = raw.trim().to_lowercase();
            if word.is_empty() || !seen.insert(word.clone()) {
                continue;
            }
            outcome.total_words += 1;
            if self.upsert(learner_id, &word, now).await? {
                outcome.new_words.push(word);
            }
        }

        tracing::debug!(
            learner_id = %learner_id,
            new_words = outcome.new_words.len(),
            total_words = outcome.total_words,
            "Ingested words"
        );
        Ok(outcome)
    }

    /// Check-then-act upsert. Returns true when a new row was created.
    async fn upsert(&self, learner_id: LearnerId, word: &str, at: DateTime<Utc>) -> Result<bool> {
        if let Some(existing) = self.store.find_word(learner_id, word).await? {
            self.store.update_word(seen_again(existing, at)).await?;
            return Ok(false);
        }

        match self.store.insert_word(Word::first_sighting(learner_id, word, at)).await {
            Ok(()) => Ok(true),
            Err(StoreError::DuplicateWord { .. }) => {
                // Another request created the row first; count this sighting on it
                tracing::debug!(learner_id = %learner_id, word = %word, "Lost insert race, updating");
                let existing = self
                    .store
                    .find_word(learner_id, word)
                    .await?
                    .ok_or_else(|| StoreError::Missing(format!("word '{}'", word)))?;
                self.store.update_word(seen_again(existing, at)).await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn word(&self, word_id: WordId) -> Result<Word> {
        self.store
            .word(word_id)
            .await?
            .ok_or(EngineError::WordNotFound(word_id))
    }

    /// Apply a practice result using the owning learner's settings
    pub async fn record_result(&self, word_id: WordId, result: PracticeResult) -> Result<Word> {
        let word = self.word(word_id).await?;
        let learner = self.learner(word.learner_id).await?;
        let rules = MasteryRules::from(&learner.settings);

        let next = mastery::apply_result(&word, result, &rules, Utc::now());
        self.store.update_word(next.clone()).await?;
        log_transition(&word, &next);
        Ok(next)
    }

    /// Mark a word mastered after an external certification
    pub async fn force_master(&self, word_id: WordId) -> Result<Word> {
        let word = self.word(word_id).await?;
        let learner = self.learner(word.learner_id).await?;
        let rules = MasteryRules::from(&learner.settings);

        let next = mastery::force_master(&word, &rules, Utc::now());
        self.store.update_word(next.clone()).await?;
        log_transition(&word, &next);
        Ok(next)
    }

    /// All of a learner's words, alphabetically
    pub async fn words(&self, learner_id: LearnerId) -> Result<Vec<Word>> {
        self.learner(learner_id).await?;
        let mut words = self.store.words_for_learner(learner_id).await?;
        words.sort_by(|a, b| a.word.cmp(&b.word));
        Ok(words)
    }

    pub async fn status_counts(&self, learner_id: LearnerId) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for word in self.words(learner_id).await? {
            match word.status {
                WordStatus::New => counts.new += 1,
                WordStatus::Learning => counts.learning += 1,
                WordStatus::Mastered => counts.mastered += 1,
            }
        }
        Ok(counts)
    }
}

fn seen_again(mut word: Word, at: DateTime<Utc>) -> Word {
    word.total_occurrences += 1;
    word.sessions_seen_count += 1;
    word.last_seen = at;
    word
}

fn log_transition(before: &Word, after: &Word) {
    if before.status != after.status {
        tracing::info!(
            learner_id = %after.learner_id,
            word = %after.word,
            from = ?before.status,
            to = ?after.status,
            "Word status changed"
        );
    }
}
