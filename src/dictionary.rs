//! Dictionary-backed word validation.
//!
//! Wraps a Hunspell dictionary (via zspell) as a [`WordValidator`]. Tokens
//! must first pass the shape rules; allow-listed words skip the lookup, so a
//! small children's dictionary does not reject "a" or "I".

use std::fs;
use std::path::Path;

use zspell::Dictionary;

use crate::config::ValidationMode;
use crate::error::{EngineError, Result};
use crate::lexicon;
use crate::validator::{Rejection, ShapeValidator, WordValidator};

/// Shape rules plus a Hunspell lookup
pub struct DictionaryValidator {
    shape: ShapeValidator,
    dictionary: Dictionary,
}

impl DictionaryValidator {
    /// Build from Hunspell `.aff` and `.dic` contents
    pub fn from_hunspell(aff: &str, dic: &str, mode: ValidationMode) -> Result<Self> {
        let dictionary = zspell::builder()
            .config_str(aff)
            .dict_str(dic)
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("Failed to build dictionary: {}", e)))?;

        Ok(Self {
            shape: ShapeValidator::new(mode),
            dictionary,
        })
    }

    /// Load `<name>.aff` and `<name>.dic` from a directory
    pub fn load(dict_dir: &Path, name: &str, mode: ValidationMode) -> Result<Self> {
        let aff_path = dict_dir.join(format!("{}.aff", name));
        let dic_path = dict_dir.join(format!("{}.dic", name));

        let aff = fs::read_to_string(&aff_path).map_err(|e| {
            EngineError::InvalidConfig(format!("Failed to read {}: {}", aff_path.display(), e))
        })?;
        let dic = fs::read_to_string(&dic_path).map_err(|e| {
            EngineError::InvalidConfig(format!("Failed to read {}: {}", dic_path.display(), e))
        })?;

        let validator = Self::from_hunspell(&aff, &dic, mode)?;
        tracing::info!(dictionary = %name, dir = %dict_dir.display(), "Loaded dictionary");
        Ok(validator)
    }
}

impl WordValidator for DictionaryValidator {
    fn check(&self, word: &str) -> std::result::Result<(), Rejection> {
        self.shape.check(word)?;

        let lower = word.to_lowercase();
        if lexicon::is_allowed(&lower) || self.dictionary.check_word(&lower) {
            Ok(())
        } else {
            Err(Rejection::NotInDictionary)
        }
    }
}
