//! Fixed word lists used by the normalizer and validators.

use std::collections::HashSet;

use lazy_static::lazy_static;

lazy_static! {
    // Short or common words that bypass the unknown-word shape rules
    static ref ALLOW_LIST: HashSet<&'static str> = {
        let words = [
            "a", "i", "am", "an", "as", "at", "be", "by", "do", "go", "he", "hi", "if", "in",
            "is", "it", "me", "my", "no", "of", "oh", "ok", "on", "or", "so", "to", "up", "us",
            "we", "ah", "ha", "ox", "yo",
            "the", "and", "but", "for", "not", "you", "all", "any", "can", "had", "her", "was",
            "one", "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now",
            "old", "see", "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she",
            "too", "use", "dad", "mom", "cat", "dog", "sun", "sky", "fly", "cry", "dry", "try",
            "why", "shy", "spy", "hmm", "shh", "zzz", "brr", "grr", "tsk", "psst",
            "rhythm", "rhythms", "lynx", "gym", "gyms", "myth", "myths", "nymph", "crypt",
        ];
        words.iter().cloned().collect()
    };

    // Function words excluded from repeated-word reports and, when a learner
    // enables it, from the candidate set
    static ref STOP_WORDS: HashSet<&'static str> = {
        let words = [
            "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
            "by", "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had",
            "do", "does", "did", "will", "would", "could", "should", "may", "might", "must",
            "shall", "can", "this", "that", "these", "those", "it", "its", "he", "she",
            "they", "him", "her", "them", "his", "their", "my", "your", "our", "who", "which",
            "what", "where", "when", "why", "how", "all", "each", "so", "than", "too", "very",
            "just", "also", "now", "i", "you", "we", "me", "us", "not", "no", "if", "then",
            "there", "here", "up", "out", "into", "over",
        ];
        words.iter().cloned().collect()
    };
}

/// Whether a lowercase word is on the allow-list
pub fn is_allowed(word: &str) -> bool {
    ALLOW_LIST.contains(word)
}

/// Whether a lowercase word is a stop word
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}
