//! Word mastery state machine.
//!
//! ```text
//!   new ──(any result)──▶ learning ──(correct count ≥ threshold)──▶ mastered
//!                             ▲                                        │
//!                             └────(miss in review, demotion on)───────┘
//! ```
//!
//! `force_master` is the only other way into `mastered`. Nothing returns a
//! word to `new`. Functions here are pure: they take the current word and
//! return the next one, and the caller persists it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LearnerSettings;
use crate::model::{Word, WordStatus};

/// Where a practice result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeContext {
    /// First-pass learning (flashcards, games)
    #[default]
    Practice,
    /// Revisiting words already learned
    Review,
}

/// A single practice outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeResult {
    pub correct: bool,
    pub context: PracticeContext,
}

impl PracticeResult {
    pub fn correct(context: PracticeContext) -> Self {
        Self { correct: true, context }
    }

    pub fn incorrect(context: PracticeContext) -> Self {
        Self { correct: false, context }
    }
}

/// Learner-scoped transition parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryRules {
    threshold: u32,
    demote_on_miss: bool,
}

impl MasteryRules {
    /// A threshold of zero is treated as one
    pub fn new(threshold: u32, demote_on_miss: bool) -> Self {
        Self {
            threshold: threshold.max(1),
            demote_on_miss,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn demote_on_miss(&self) -> bool {
        self.demote_on_miss
    }
}

impl From<&LearnerSettings> for MasteryRules {
    fn from(settings: &LearnerSettings) -> Self {
        Self::new(settings.mastery_threshold, settings.demote_on_miss)
    }
}

/// Next state of `word` after a practice result
pub fn apply_result(word: &Word, result: PracticeResult, rules: &MasteryRules, at: DateTime<Utc>) -> Word {
    let mut next = word.clone();
    next.last_tested = Some(at);

    if result.correct {
        next.mastery_correct_count = (next.mastery_correct_count + 1).min(rules.threshold);
        if next.mastery_correct_count >= rules.threshold {
            next.status = WordStatus::Mastered;
        } else if next.status == WordStatus::New {
            next.status = WordStatus::Learning;
        }
    } else {
        next.incorrect_count = next.incorrect_count.saturating_add(1);
        next.mastery_correct_count = next.mastery_correct_count.saturating_sub(1);

        let demote = result.context == PracticeContext::Review
            && rules.demote_on_miss
            && next.status == WordStatus::Mastered;
        if demote || next.status == WordStatus::New {
            next.status = WordStatus::Learning;
        }
    }
    next
}

/// Mark a word mastered regardless of its history
pub fn force_master(word: &Word, rules: &MasteryRules, at: DateTime<Utc>) -> Word {
    let mut next = word.clone();
    next.status = WordStatus::Mastered;
    next.mastery_correct_count = rules.threshold;
    next.last_tested = Some(at);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn fresh() -> Word {
        Word::first_sighting(Uuid::new_v4(), "cat", Utc::now())
    }

    fn run(word: Word, results: &[PracticeResult], rules: &MasteryRules) -> Word {
        results
            .iter()
            .fold(word, |w, r| apply_result(&w, *r, rules, Utc::now()))
    }

    #[test]
    fn test_three_correct_masters_word() {
        let rules = MasteryRules::new(3, true);
        let ok = PracticeResult::correct(PracticeContext::Practice);

        let once = apply_result(&fresh(), ok, &rules, Utc::now());
        assert_eq!(once.status, WordStatus::Learning);
        assert!(once.last_tested.is_some());

        let word = run(once, &[ok, ok], &rules);
        assert_eq!(word.status, WordStatus::Mastered);
        assert_eq!(word.mastery_correct_count, 3);
    }

    #[test]
    fn test_review_miss_demotes_mastered_word() {
        let rules = MasteryRules::new(3, true);
        let ok = PracticeResult::correct(PracticeContext::Practice);
        let mastered = run(fresh(), &[ok, ok, ok], &rules);

        let word = apply_result(
            &mastered,
            PracticeResult::incorrect(PracticeContext::Review),
            &rules,
            Utc::now(),
        );
        assert_eq!(word.status, WordStatus::Learning);
        assert_eq!(word.mastery_correct_count, 2);
        assert_eq!(word.incorrect_count, 1);
    }

    #[test]
    fn test_practice_miss_keeps_mastered_status() {
        let rules = MasteryRules::new(3, true);
        let ok = PracticeResult::correct(PracticeContext::Practice);
        let mastered = run(fresh(), &[ok, ok, ok], &rules);

        let word = apply_result(
            &mastered,
            PracticeResult::incorrect(PracticeContext::Practice),
            &rules,
            Utc::now(),
        );
        assert_eq!(word.status, WordStatus::Mastered);
        assert_eq!(word.mastery_correct_count, 2);
    }

    #[test]
    fn test_demotion_disabled() {
        let rules = MasteryRules::new(2, false);
        let ok = PracticeResult::correct(PracticeContext::Review);
        let mastered = run(fresh(), &[ok, ok], &rules);

        let word = apply_result(
            &mastered,
            PracticeResult::incorrect(PracticeContext::Review),
            &rules,
            Utc::now(),
        );
        assert_eq!(word.status, WordStatus::Mastered);
    }

    #[test]
    fn test_first_miss_moves_new_to_learning() {
        let rules = MasteryRules::new(7, true);
        let word = apply_result(
            &fresh(),
            PracticeResult::incorrect(PracticeContext::Practice),
            &rules,
            Utc::now(),
        );
        assert_eq!(word.status, WordStatus::Learning);
        assert_eq!(word.mastery_correct_count, 0);
        assert_eq!(word.incorrect_count, 1);
    }

    #[test]
    fn test_force_master() {
        let rules = MasteryRules::new(5, true);
        let word = force_master(&fresh(), &rules, Utc::now());
        assert_eq!(word.status, WordStatus::Mastered);
        assert_eq!(word.mastery_correct_count, 5);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let rules = MasteryRules::new(0, true);
        assert_eq!(rules.threshold(), 1);
        let word = apply_result(
            &fresh(),
            PracticeResult::correct(PracticeContext::Practice),
            &rules,
            Utc::now(),
        );
        assert_eq!(word.status, WordStatus::Mastered);
    }

    fn result_strategy() -> impl Strategy<Value = PracticeResult> {
        (any::<bool>(), any::<bool>()).prop_map(|(correct, review)| PracticeResult {
            correct,
            context: if review {
                PracticeContext::Review
            } else {
                PracticeContext::Practice
            },
        })
    }

    proptest! {
        #[test]
        fn prop_counts_stay_in_bounds(
            threshold in 1u32..10,
            demote in any::<bool>(),
            results in prop::collection::vec(result_strategy(), 0..60),
        ) {
            let rules = MasteryRules::new(threshold, demote);
            let mut word = fresh();
            let mut misses = 0;
            for result in results {
                let prev = word.clone();
                word = apply_result(&prev, result, &rules, Utc::now());

                prop_assert!(word.mastery_correct_count <= threshold);
                if !result.correct {
                    misses += 1;
                }
                prop_assert_eq!(word.incorrect_count, misses);
                prop_assert_ne!(word.status, WordStatus::New);

                if word.status == WordStatus::Mastered && prev.status != WordStatus::Mastered {
                    prop_assert_eq!(word.mastery_correct_count, threshold);
                }
                if prev.status == WordStatus::Mastered && word.status != WordStatus::Mastered {
                    prop_assert!(!result.correct && result.context == PracticeContext::Review && demote);
                }
            }
        }
    }
}
