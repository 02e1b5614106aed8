//! Engine and learner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default percentage of a book that must be mastered to be "ready"
pub const DEFAULT_READINESS_THRESHOLD: u8 = 90;

/// How strict the word-shape validator is about length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Words of 2..=20 letters
    #[default]
    Lenient,
    /// Words of 3..=18 letters
    Strict,
}

impl ValidationMode {
    pub fn min_len(self) -> usize {
        match self {
            Self::Lenient => 2,
            Self::Strict => 3,
        }
    }

    pub fn max_len(self) -> usize {
        match self {
            Self::Lenient => 20,
            Self::Strict => 18,
        }
    }
}

/// Text normalizer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizerConfig {
    /// Lines need at least this share of letters to survive
    pub min_letter_ratio: f64,
    /// Lines with at least this many letters may use the relaxed ratio
    pub relaxed_min_letters: usize,
    pub relaxed_min_ratio: f64,
    pub validation_mode: ValidationMode,
    /// Longest word kept when the grade-level filter is on
    pub grade_level_max_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_letter_ratio: 0.60,
            relaxed_min_letters: 10,
            relaxed_min_ratio: 0.40,
            validation_mode: ValidationMode::Lenient,
            grade_level_max_len: 10,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("minLetterRatio", self.min_letter_ratio),
            ("relaxedMinRatio", self.relaxed_min_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if self.grade_level_max_len < self.validation_mode.min_len() {
            return Err(EngineError::InvalidConfig(format!(
                "gradeLevelMaxLen {} is shorter than the shortest accepted word",
                self.grade_level_max_len
            )));
        }
        Ok(())
    }
}

/// Background statistics resync tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResyncConfig {
    /// Attempts per coalesced batch of requests before giving up
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 50,
        }
    }
}

/// Process-wide engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub readiness_threshold: u8,
    /// How many repeated words an ingest summary reports
    pub top_repeated_words: usize,
    pub normalizer: NormalizerConfig,
    pub resync: ResyncConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness_threshold: DEFAULT_READINESS_THRESHOLD,
            top_repeated_words: 10,
            normalizer: NormalizerConfig::default(),
            resync: ResyncConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `VOCAB_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<u8>("VOCAB_READINESS_THRESHOLD")? {
            config.readiness_threshold = v;
        }
        if let Some(v) = env_parse::<usize>("VOCAB_TOP_REPEATED_WORDS")? {
            config.top_repeated_words = v;
        }
        if let Some(v) = env_parse::<f64>("VOCAB_MIN_LETTER_RATIO")? {
            config.normalizer.min_letter_ratio = v;
        }
        if let Some(v) = env_parse::<usize>("VOCAB_GRADE_LEVEL_MAX_LEN")? {
            config.normalizer.grade_level_max_len = v;
        }
        if let Ok(mode) = std::env::var("VOCAB_VALIDATION_MODE") {
            config.normalizer.validation_mode = match mode.to_lowercase().as_str() {
                "strict" => ValidationMode::Strict,
                "lenient" => ValidationMode::Lenient,
                other => {
                    return Err(EngineError::InvalidConfig(format!(
                        "VOCAB_VALIDATION_MODE must be 'strict' or 'lenient', got '{}'",
                        other
                    )));
                }
            };
        }
        if let Some(v) = env_parse::<u32>("VOCAB_RESYNC_MAX_ATTEMPTS")? {
            config.resync.max_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("VOCAB_RESYNC_RETRY_DELAY_MS")? {
            config.resync.retry_delay_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.readiness_threshold > 100 {
            return Err(EngineError::InvalidConfig(format!(
                "readiness threshold {} is above 100",
                self.readiness_threshold
            )));
        }
        self.normalizer.validate()?;
        if self.resync.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "resync.maxAttempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| EngineError::InvalidConfig(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

/// Per-learner practice configuration, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearnerSettings {
    pub mastery_threshold: u32,
    pub deck_size: usize,
    pub demote_on_miss: bool,
    pub stop_words_enabled: bool,
    pub grade_level_filter_enabled: bool,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            mastery_threshold: 7,
            deck_size: 7,
            demote_on_miss: true,
            stop_words_enabled: false,
            grade_level_filter_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.readiness_threshold, 90);
        assert!(config.validate().is_ok());

        let settings = LearnerSettings::default();
        assert_eq!(settings.mastery_threshold, 7);
        assert_eq!(settings.deck_size, 7);
        assert!(settings.demote_on_miss);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: LearnerSettings =
            serde_json::from_str(r#"{"masteryThreshold": 3, "stopWordsEnabled": true}"#).unwrap();
        assert_eq!(settings.mastery_threshold, 3);
        assert!(settings.stop_words_enabled);
        assert_eq!(settings.deck_size, 7);

        let config: EngineConfig =
            serde_json::from_str(r#"{"normalizer": {"validationMode": "strict"}}"#).unwrap();
        assert_eq!(config.normalizer.validation_mode, ValidationMode::Strict);
        assert_eq!(config.normalizer.min_letter_ratio, 0.60);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.readiness_threshold = 120;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.normalizer.min_letter_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.resync.max_attempts = 0;
        assert!(config.validate().is_err());

        let normalizer = NormalizerConfig {
            grade_level_max_len: 1,
            ..Default::default()
        };
        assert!(normalizer.validate().is_err());
        assert!(NormalizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mode_lengths() {
        assert_eq!(ValidationMode::Lenient.min_len(), 2);
        assert_eq!(ValidationMode::Strict.min_len(), 3);
        assert_eq!(ValidationMode::Strict.max_len(), 18);
    }
}
