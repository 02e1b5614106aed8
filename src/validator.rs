//! Word-shape validation.
//!
//! Candidate tokens coming out of OCR are filtered by a [`WordValidator`].
//! The default [`ShapeValidator`] is a best-effort noise filter built from a
//! handful of shape rules; `DictionaryValidator` (see `dictionary.rs`) adds a
//! Hunspell lookup on top.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::config::ValidationMode;
use crate::lexicon;

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    TooShort,
    TooLong,
    NotAlphabetic,
    AllConsonants,
    NoVowel,
    TripleRepeat,
    ConsonantRun,
    NotInDictionary,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::NotAlphabetic => "not_alphabetic",
            Self::AllConsonants => "all_consonants",
            Self::NoVowel => "no_vowel",
            Self::TripleRepeat => "triple_repeat",
            Self::ConsonantRun => "consonant_run",
            Self::NotInDictionary => "not_in_dictionary",
        };
        f.write_str(s)
    }
}

/// A pluggable accept/reject rule set for candidate words
pub trait WordValidator: Send + Sync {
    /// Check a single token; `Ok(())` means the token is a plausible word
    fn check(&self, word: &str) -> Result<(), Rejection>;

    fn accepts(&self, word: &str) -> bool {
        self.check(word).is_ok()
    }
}

lazy_static! {
    // Shape rules, applied in order after the length checks.
    // Rust regex has no backreferences, so repeats are enumerated.
    static ref SHAPE_RULES: Vec<(Regex, Rejection)> = vec![
        (Regex::new(r"^[bcdfghjklmnpqrstvwxz]{4,}$").unwrap(), Rejection::AllConsonants),
        (Regex::new(r"^[^aeiouy]+$").unwrap(), Rejection::NoVowel),
        (
            Regex::new(r"(aaa|bbb|ccc|ddd|eee|fff|ggg|hhh|iii|jjj|kkk|lll|mmm|nnn|ooo|ppp|qqq|rrr|sss|ttt|uuu|vvv|www|xxx|yyy|zzz)").unwrap(),
            Rejection::TripleRepeat,
        ),
        (Regex::new(r"[bcdfghjklmnpqrstvwxz]{5,}").unwrap(), Rejection::ConsonantRun),
    ];
}

/// Heuristic validator: length bounds, vowel presence, repeat and consonant
/// run limits, with an allow-list bypass for known short words.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeValidator {
    mode: ValidationMode,
}

impl ShapeValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }
}

impl WordValidator for ShapeValidator {
    fn check(&self, word: &str) -> Result<(), Rejection> {
        let lower = word.to_lowercase();
        if lower.is_empty() || !lower.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(Rejection::NotAlphabetic);
        }

        let len = lower.len();
        if len > self.mode.max_len() {
            return Err(Rejection::TooLong);
        }
        if lexicon::is_allowed(&lower) {
            return Ok(());
        }
        if len < self.mode.min_len() {
            return Err(Rejection::TooShort);
        }

        for (pattern, reason) in SHAPE_RULES.iter() {
            if pattern.is_match(&lower) {
                return Err(*reason);
            }
        }
        Ok(())
    }
}
