//! OCR text normalization.
//!
//! Turns raw text returned by a vision/OCR service into candidate vocabulary.
//! The pipeline is lossy on purpose: it prefers dropping a real word over
//! admitting noise, and it never fails. The worst case is an empty result.
//!
//! Stages, each working on the previous stage's output:
//! 1. unicode cleanup (decompose accents, ASCII quotes/dashes, strip controls)
//! 2. re-join words hyphenated across a line break
//! 3. OCR confusion fixes (digits enclosed by letters, whole-word misreads)
//! 4. drop page markers and low letter-density lines
//! 5. strip stray symbols, collapse whitespace, drop isolated letters
//! 6. drop consecutive duplicate lines
//! 7. tokenize into letter runs and validate each token

use std::collections::BTreeMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::{LearnerSettings, NormalizerConfig};
use crate::lexicon;
use crate::validator::{Rejection, ShapeValidator, WordValidator};

// Pre-compile all patterns at module load time
lazy_static! {
    // Whole-word optical misreads (h/li, rn/m, b/h confusion)
    static ref OCR_WORD_FIXES: Vec<(Regex, &'static str)> = vec![
        // 'the' variants (most common)
        (Regex::new(r"(?i)\btbe\b").unwrap(), "the"),
        (Regex::new(r"(?i)\btlie\b").unwrap(), "the"),
        (Regex::new(r"(?i)\btiie\b").unwrap(), "the"),
        (Regex::new(r"(?i)\bihe\b").unwrap(), "the"),
        (Regex::new(r"(?i)\btne\b").unwrap(), "the"),
        (Regex::new(r"(?i)\bthc\b").unwrap(), "the"),
        // li -> h
        (Regex::new(r"(?i)\btliis\b").unwrap(), "this"),
        (Regex::new(r"(?i)\btliat\b").unwrap(), "that"),
        (Regex::new(r"(?i)\btliey\b").unwrap(), "they"),
        (Regex::new(r"(?i)\btliere\b").unwrap(), "there"),
        (Regex::new(r"(?i)\bwlien\b").unwrap(), "when"),
        (Regex::new(r"(?i)\bwliat\b").unwrap(), "what"),
        (Regex::new(r"(?i)\bsbe\b").unwrap(), "she"),
        (Regex::new(r"(?i)\bliave\b").unwrap(), "have"),
        (Regex::new(r"(?i)\bliouse\b").unwrap(), "house"),
        (Regex::new(r"(?i)\bliappy\b").unwrap(), "happy"),
        // rn -> m
        (Regex::new(r"(?i)\brnay\b").unwrap(), "may"),
        (Regex::new(r"(?i)\brnore\b").unwrap(), "more"),
        (Regex::new(r"(?i)\btirne\b").unwrap(), "time"),
        (Regex::new(r"(?i)\bnarne\b").unwrap(), "name"),
        (Regex::new(r"(?i)\bcorne\b").unwrap(), "come"),
        (Regex::new(r"(?i)\bhorne\b").unwrap(), "home"),
        (Regex::new(r"(?i)\brnom\b").unwrap(), "mom"),
        // n/u confusion
        (Regex::new(r"(?i)\bwonld\b").unwrap(), "would"),
        (Regex::new(r"(?i)\bconld\b").unwrap(), "could"),
        (Regex::new(r"(?i)\bsnn\b").unwrap(), "sun"),
    ];

    static ref HYPHEN_BREAK: Regex = Regex::new(r"([A-Za-z])-[ \t]*\n[ \t]*([A-Za-z])").unwrap();

    // Alphanumeric runs that may hide a digit/letter confusion
    static ref ALNUM_RUN: Regex = Regex::new(r"\b[A-Za-z0-9]+\b").unwrap();

    // Digit standing in for a capital I at the start of a short word ("1t" -> "it")
    static ref DIGIT_AS_I: Regex = Regex::new(r"^1[tsnf]$").unwrap();

    // Running page markers: "Page 12", "pg. 3", "p. 7 of 40"
    static ref PAGE_MARKER: Regex =
        Regex::new(r"(?i)^(?:page|pg\.?|p\.)\s*\d+(?:\s*(?:of|/)\s*\d+)?$").unwrap();

    static ref STRAY_CHARS: Regex = Regex::new(r#"[^A-Za-z'".,!?;:\-\s]"#).unwrap();

    static ref LETTER_RUN: Regex = Regex::new(r"[A-Za-z]+").unwrap();
}

/// Map a digit commonly misread for a letter
fn digit_to_letter(c: char) -> Option<char> {
    match c {
        '0' => Some('o'),
        '1' => Some('l'),
        '5' => Some('s'),
        '8' => Some('b'),
        _ => None,
    }
}

/// Per-call filters driven by learner settings
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub filter_stop_words: bool,
    pub grade_level_filter: bool,
}

impl From<&LearnerSettings> for NormalizeOptions {
    fn from(settings: &LearnerSettings) -> Self {
        Self {
            filter_stop_words: settings.stop_words_enabled,
            grade_level_filter: settings.grade_level_filter_enabled,
        }
    }
}

/// Output of the normalizer
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedText {
    pub cleaned_text: String,
    /// Unique lowercase tokens in order of first appearance
    pub candidate_words: Vec<String>,
    pub word_frequencies: BTreeMap<String, u64>,
    pub lines_dropped: usize,
    pub duplicate_lines_removed: usize,
    pub ocr_fixes: u64,
    /// First rejection reason for each rejected token
    pub rejected: BTreeMap<String, Rejection>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.candidate_words.is_empty()
    }

    /// Most frequent repeated words, ignoring stop words and words under 3
    /// letters. Ties keep order of first appearance.
    pub fn top_repeated_words(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(usize, &String, u64)> = self
            .candidate_words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.len() >= 3 && !lexicon::is_stop_word(w))
            .filter_map(|(i, w)| {
                let count = self.word_frequencies.get(w).copied().unwrap_or(0);
                (count >= 2).then_some((i, w, count))
            })
            .collect();

        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(n)
            .map(|(_, w, count)| (w.clone(), count))
            .collect()
    }

    fn record(&mut self, word: String) {
        let count = self.word_frequencies.entry(word.clone()).or_insert(0);
        if *count == 0 {
            self.candidate_words.push(word);
        }
        *count += 1;
    }

    /// Append another page's result, keeping first-appearance order
    fn merge(&mut self, other: NormalizedText) {
        if !other.cleaned_text.is_empty() {
            if !self.cleaned_text.is_empty() {
                self.cleaned_text.push('\n');
            }
            self.cleaned_text.push_str(&other.cleaned_text);
        }
        for word in other.candidate_words {
            let by = other.word_frequencies.get(&word).copied().unwrap_or(1);
            let count = self.word_frequencies.entry(word.clone()).or_insert(0);
            if *count == 0 {
                self.candidate_words.push(word);
            }
            *count += by;
        }
        self.lines_dropped += other.lines_dropped;
        self.duplicate_lines_removed += other.duplicate_lines_removed;
        self.ocr_fixes += other.ocr_fixes;
        for (word, reason) in other.rejected {
            self.rejected.entry(word).or_insert(reason);
        }
    }
}

/// Cleans OCR text and extracts candidate words
#[derive(Clone)]
pub struct TextNormalizer {
    config: NormalizerConfig,
    validator: Arc<dyn WordValidator>,
}

impl TextNormalizer {
    /// Normalizer using the shape validator for the configured mode
    pub fn new(config: NormalizerConfig) -> Self {
        let validator = Arc::new(ShapeValidator::new(config.validation_mode));
        Self { config, validator }
    }

    pub fn with_validator(config: NormalizerConfig, validator: Arc<dyn WordValidator>) -> Self {
        Self { config, validator }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn validator(&self) -> &dyn WordValidator {
        self.validator.as_ref()
    }

    pub fn normalize(&self, raw: &str) -> NormalizedText {
        self.normalize_with(raw, NormalizeOptions::default())
    }

    pub fn normalize_with(&self, raw: &str, options: NormalizeOptions) -> NormalizedText {
        let mut out = NormalizedText::default();

        let text = unicode_cleanup(raw);
        let text = rejoin_hyphenated(&text);
        let (text, fixes) = fix_ocr_confusions(&text);
        out.ocr_fixes = fixes;

        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if PAGE_MARKER.is_match(trimmed) || !self.is_dense_enough(trimmed) {
                out.lines_dropped += 1;
                continue;
            }
            let cleaned = clean_line(trimmed);
            if cleaned.is_empty() {
                out.lines_dropped += 1;
                continue;
            }
            if lines
                .last()
                .is_some_and(|prev| prev.eq_ignore_ascii_case(&cleaned))
            {
                out.duplicate_lines_removed += 1;
                continue;
            }
            lines.push(cleaned);
        }

        for line in &lines {
            for token in LETTER_RUN.find_iter(line) {
                let word = token.as_str().to_lowercase();
                if let Err(reason) = self.validator.check(&word) {
                    out.rejected.entry(word).or_insert(reason);
                    continue;
                }
                if options.filter_stop_words && lexicon::is_stop_word(&word) {
                    continue;
                }
                if options.grade_level_filter && word.len() > self.config.grade_level_max_len {
                    continue;
                }
                out.record(word);
            }
        }
        out.cleaned_text = lines.join("\n");

        tracing::debug!(
            candidates = out.candidate_words.len(),
            lines_kept = lines.len(),
            lines_dropped = out.lines_dropped,
            ocr_fixes = out.ocr_fixes,
            rejected = out.rejected.len(),
            "Normalized text"
        );
        out
    }

    /// Normalize several OCR pages in parallel and merge them in page order
    pub fn normalize_pages<S>(&self, pages: &[S], options: NormalizeOptions) -> NormalizedText
    where
        S: AsRef<str> + Sync,
    {
        let results: Vec<NormalizedText> = pages
            .par_iter()
            .map(|page| self.normalize_with(page.as_ref(), options))
            .collect();

        let mut merged = NormalizedText::default();
        for result in results {
            merged.merge(result);
        }
        merged
    }

    /// Letter-density gate for a single trimmed line.
    ///
    /// Density is letters over non-whitespace characters, so word spacing in
    /// short early-reader lines ("Go, Dog. Go!") does not count against them.
    pub fn is_dense_enough(&self, line: &str) -> bool {
        let visible = line.chars().filter(|c| !c.is_whitespace()).count();
        if visible == 0 {
            return false;
        }
        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        let ratio = letters as f64 / visible as f64;

        ratio >= self.config.min_letter_ratio
            || (letters >= self.config.relaxed_min_letters && ratio >= self.config.relaxed_min_ratio)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

/// Decompose accents, ASCII-fy quotes/dashes/ligatures, drop control characters
fn unicode_cleanup(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());

    for c in unified.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{00A0}' | '\t' => out.push(' '),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn rejoin_hyphenated(text: &str) -> String {
    HYPHEN_BREAK.replace_all(text, "$1$2").into_owned()
}

/// Apply digit-in-word fixes and the whole-word misread table.
///
/// Returns the fixed text and the number of substitutions made.
fn fix_ocr_confusions(text: &str) -> (String, u64) {
    let mut total_subs: u64 = 0;

    let mut result = ALNUM_RUN
        .replace_all(text, |caps: &regex::Captures| {
            let run = &caps[0];
            match fix_enclosed_digits(run) {
                Some(fixed) => {
                    total_subs += 1;
                    fixed
                }
                None => run.to_string(),
            }
        })
        .into_owned();

    for (pattern, replacement) in OCR_WORD_FIXES.iter() {
        let before_count = pattern.find_iter(&result).count();
        if before_count > 0 {
            result = pattern.replace_all(&result, *replacement).into_owned();
            total_subs += before_count as u64;
        }
    }

    (result, total_subs)
}

/// Rewrite a run whose digits all sit between letters ("b00k", "g0od").
///
/// Leading or trailing digits mark ordinals, times and codes ("10th", "8am",
/// "A1") and leave the run untouched, apart from the short `1t`/`1s`/`1n`/`1f`
/// forms of a misread capital I.
fn fix_enclosed_digits(run: &str) -> Option<String> {
    if DIGIT_AS_I.is_match(run) {
        return Some(format!("i{}", &run[1..]));
    }

    let chars: Vec<char> = run.chars().collect();
    let first = chars.first()?;
    let last = chars.last()?;
    if !first.is_ascii_alphabetic() || !last.is_ascii_alphabetic() {
        return None;
    }
    if !chars.iter().any(|c| c.is_ascii_digit()) {
        return None;
    }

    chars
        .iter()
        .map(|&c| if c.is_ascii_digit() { digit_to_letter(c) } else { Some(c) })
        .collect()
}

/// Strip stray symbols, collapse whitespace, drop isolated letters except I/a
fn clean_line(line: &str) -> String {
    let stripped = STRAY_CHARS.replace_all(line, " ");
    stripped
        .split_whitespace()
        .filter(|token| {
            let mut letters = token.chars().filter(|c| c.is_alphabetic());
            match (letters.next(), letters.next()) {
                (None, _) => true,
                (Some(c), None) => matches!(c, 'I' | 'a' | 'A'),
                _ => true,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
