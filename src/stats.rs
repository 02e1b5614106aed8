//! Cross-book word statistics.
//!
//! The index is a cache derived entirely from the book collection. It is
//! only ever rebuilt from scratch and swapped in whole; there is no
//! incremental update path.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Book, GlobalWordStats};
use crate::store::Store;

/// `round(book_count * ln(1 + total_occurrences) * 1000)`
pub fn leverage_score(book_count: u64, total_occurrences: u64) -> i64 {
    (book_count as f64 * (1.0 + total_occurrences as f64).ln() * 1000.0).round() as i64
}

#[derive(Default)]
struct Tally {
    book_count: u64,
    total_occurrences: u64,
}

/// Recompute statistics for every word in `books`, sorted by word.
///
/// A word counts once per book no matter how often it repeats there; its
/// in-book occurrence count (at least 1) feeds `total_occurrences`.
pub fn compute_stats(books: &[Book]) -> Vec<GlobalWordStats> {
    let tallies = books
        .par_iter()
        .fold(HashMap::<String, Tally>::new, |mut acc, book| {
            let mut seen = HashSet::new();
            for raw in &book.words {
                let word = raw.trim().to_lowercase();
                if word.is_empty() || !seen.insert(word.clone()) {
                    continue;
                }
                let occurrences = book
                    .occurrences
                    .get(raw)
                    .or_else(|| book.occurrences.get(&word))
                    .copied()
                    .unwrap_or(1)
                    .max(1);
                let tally = acc.entry(word).or_default();
                tally.book_count += 1;
                tally.total_occurrences += occurrences;
            }
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (word, tally) in right {
                let entry = left.entry(word).or_default();
                entry.book_count += tally.book_count;
                entry.total_occurrences += tally.total_occurrences;
            }
            left
        });

    let ordered: BTreeMap<String, Tally> = tallies.into_iter().collect();
    ordered
        .into_iter()
        .map(|(word, t)| GlobalWordStats {
            word,
            book_count: t.book_count,
            total_occurrences: t.total_occurrences,
            leverage_score: leverage_score(t.book_count, t.total_occurrences),
        })
        .collect()
}

/// What a resync changed in the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub purged: usize,
    /// Rows in the index after the resync
    pub total: usize,
}

impl ResyncReport {
    pub fn diff(old: &[GlobalWordStats], new: &[GlobalWordStats]) -> Self {
        let old_by_word: HashMap<&str, &GlobalWordStats> =
            old.iter().map(|s| (s.word.as_str(), s)).collect();
        let new_words: HashSet<&str> = new.iter().map(|s| s.word.as_str()).collect();

        let mut report = Self {
            total: new.len(),
            ..Default::default()
        };
        for row in new {
            match old_by_word.get(row.word.as_str()) {
                None => report.inserted += 1,
                Some(prev) if *prev != row => report.updated += 1,
                Some(_) => {}
            }
        }
        report.purged = old_by_word
            .keys()
            .filter(|w| !new_words.contains(*w))
            .count();
        report
    }

    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.purged == 0
    }
}

/// Rebuilds and reads the statistics index
pub struct GlobalStatsIndex<S> {
    store: Arc<S>,
}

impl<S> Clone for GlobalStatsIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> GlobalStatsIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Full recompute from the book collection
    pub async fn resync(&self) -> Result<ResyncReport> {
        let books = self.store.books().await?;
        let fresh = compute_stats(&books);
        let previous = self.store.all_stats().await?;
        let report = ResyncReport::diff(&previous, &fresh);

        self.store.replace_stats(fresh).await?;

        tracing::info!(
            books = books.len(),
            words = report.total,
            inserted = report.inserted,
            updated = report.updated,
            purged = report.purged,
            "Resynced global word statistics"
        );
        Ok(report)
    }

    pub async fn lookup(&self, words: &[String]) -> Result<HashMap<String, GlobalWordStats>> {
        Ok(self.store.stats_for(words).await?)
    }

    /// Every index row, sorted by descending leverage then word
    pub async fn ranked(&self) -> Result<Vec<GlobalWordStats>> {
        let mut rows = self.store.all_stats().await?;
        rows.sort_by(|a, b| {
            b.leverage_score
                .cmp(&a.leverage_score)
                .then_with(|| a.word.cmp(&b.word))
        });
        Ok(rows)
    }
}
