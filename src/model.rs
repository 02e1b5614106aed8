//! Data model: learners, words, books and derived statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LearnerSettings;

pub type LearnerId = Uuid;
pub type WordId = Uuid;
pub type BookId = Uuid;

// ============================================================================
// Learners and Words
// ============================================================================

/// A child profile whose vocabulary is tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learner {
    pub id: LearnerId,
    pub name: String,
    #[serde(default)]
    pub settings: LearnerSettings,
}

impl Learner {
    pub fn new(name: &str, settings: LearnerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            settings,
        }
    }
}

/// Mastery status of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    #[default]
    New,
    Learning,
    Mastered,
}

/// One distinct word seen by one learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: WordId,
    pub learner_id: LearnerId,
    /// Lowercase token, unique per learner
    pub word: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_occurrences: u64,
    pub sessions_seen_count: u32,
    pub status: WordStatus,
    pub mastery_correct_count: u32,
    pub incorrect_count: u32,
    pub last_tested: Option<DateTime<Utc>>,
}

impl Word {
    /// A freshly seen word
    pub fn first_sighting(learner_id: LearnerId, word: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner_id,
            word: word.to_lowercase(),
            first_seen: at,
            last_seen: at,
            total_occurrences: 1,
            sessions_seen_count: 1,
            status: WordStatus::New,
            mastery_correct_count: 0,
            incorrect_count: 0,
            last_tested: None,
        }
    }

    pub fn is_mastered(&self) -> bool {
        self.status == WordStatus::Mastered
    }
}

// ============================================================================
// Books
// ============================================================================

/// Where a book's word list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSource {
    /// Pages photographed and run through OCR
    #[default]
    Scanned,
    /// Words typed or pasted in directly
    Manual,
}

/// Approval state of a custom book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A book and its vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    /// `None` for system preset books
    pub owner: Option<LearnerId>,
    pub is_preset: bool,
    pub is_beta: bool,
    pub source: BookSource,
    pub approval: ApprovalStatus,
    /// Unique lowercase words, in order of first appearance
    pub words: Vec<String>,
    /// In-book occurrence count for every entry of `words`
    pub occurrences: BTreeMap<String, u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Merge raw words into the word list, lower-casing and de-duplicating.
    ///
    /// Returns the number of words that were not already in the book.
    pub fn append_words<I, S>(&mut self, words: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for raw in words {
            let word = raw.as_ref().trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            let count = self.occurrences.entry(word.clone()).or_insert(0);
            if *count == 0 {
                self.words.push(word);
                added += 1;
            }
            *count += 1;
        }
        added
    }

    /// Merge pre-counted words (e.g. normalizer frequencies), keeping `order`
    pub fn append_counted(&mut self, order: &[String], counts: &BTreeMap<String, u64>) -> usize {
        let mut added = 0;
        for raw in order {
            let word = raw.to_lowercase();
            let by = counts.get(raw).copied().unwrap_or(1).max(1);
            let count = self.occurrences.entry(word.clone()).or_insert(0);
            if *count == 0 {
                self.words.push(word);
                added += 1;
            }
            *count += by;
        }
        added
    }

    pub fn unique_word_count(&self) -> usize {
        self.words.len()
    }
}

/// Fields for creating a book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub owner: Option<LearnerId>,
    #[serde(default)]
    pub is_preset: bool,
    #[serde(default)]
    pub is_beta: bool,
    #[serde(default)]
    pub source: BookSource,
    /// Raw words; repeats count as in-book occurrences
    #[serde(default)]
    pub words: Vec<String>,
}

impl NewBook {
    pub fn into_book(self, at: DateTime<Utc>) -> Book {
        let approval = if self.is_preset {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        };
        let mut book = Book {
            id: Uuid::new_v4(),
            title: self.title,
            author: self.author,
            owner: self.owner,
            is_preset: self.is_preset,
            is_beta: self.is_beta,
            source: self.source,
            approval,
            words: Vec::new(),
            occurrences: BTreeMap::new(),
            created_at: at,
            updated_at: at,
        };
        book.append_words(&self.words);
        book
    }
}

/// Partial update of book metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub is_beta: Option<bool>,
    pub approval: Option<ApprovalStatus>,
}

// ============================================================================
// Derived Views
// ============================================================================

/// Cross-book statistics for one word (derived, recomputable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalWordStats {
    pub word: String,
    pub book_count: u64,
    pub total_occurrences: u64,
    pub leverage_score: i64,
}

/// How much of a book a learner has mastered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReadiness {
    pub book_id: BookId,
    pub title: String,
    pub mastered_count: usize,
    pub total_count: usize,
    pub percent: u8,
    pub is_ready: bool,
}

/// An unmastered word ranked for practice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedWord {
    pub word: String,
    pub leverage_score: i64,
    pub book_count: u64,
    pub total_occurrences: u64,
}
