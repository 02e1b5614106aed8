//! Python bindings (enabled with the `python` feature).
//!
//! Structured results cross the boundary as JSON strings so the calling
//! web layer can pass them straight through.

use std::sync::Arc;

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{EngineConfig, LearnerSettings, ValidationMode};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::model::NewBook;
use crate::normalizer::{NormalizeOptions, TextNormalizer};
use crate::stats;
use crate::store::MemoryStore;
use crate::validator::{ShapeValidator, WordValidator};

fn to_py_err(e: EngineError) -> PyErr {
    if e.is_not_found() {
        PyKeyError::new_err(e.to_string())
    } else if matches!(e, EngineError::InvalidConfig(_)) {
        PyValueError::new_err(e.to_string())
    } else {
        PyRuntimeError::new_err(e.to_string())
    }
}

fn parse_id(id: &str) -> PyResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| PyValueError::new_err(format!("Invalid id '{}': {}", id, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> PyResult<T> {
    serde_json::from_str(json).map_err(|e| PyValueError::new_err(format!("Invalid JSON: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Clean OCR text and return the normalization report as JSON
#[pyfunction]
#[pyo3(signature = (text, filter_stop_words=false, grade_level_filter=false))]
fn normalize_text(text: String, filter_stop_words: bool, grade_level_filter: bool) -> PyResult<String> {
    let options = NormalizeOptions {
        filter_stop_words,
        grade_level_filter,
    };
    to_json(&TextNormalizer::default().normalize_with(&text, options))
}

/// Returns the rejection reason, or None if the word looks real
#[pyfunction]
#[pyo3(signature = (word, strict=false))]
fn validate_word(word: String, strict: bool) -> Option<String> {
    let mode = if strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };
    ShapeValidator::new(mode).check(&word).err().map(|r| r.to_string())
}

#[pyfunction]
fn leverage_score(book_count: u64, total_occurrences: u64) -> i64 {
    stats::leverage_score(book_count, total_occurrences)
}

/// In-memory engine driven from Python
#[pyclass(name = "Engine")]
struct PyEngine {
    runtime: tokio::runtime::Runtime,
    engine: Engine<MemoryStore>,
}

#[pymethods]
impl PyEngine {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<String>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => from_json::<EngineConfig>(&json)?,
            None => EngineConfig::from_env().map_err(to_py_err)?,
        };
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to start runtime: {}", e)))?;
        let engine = {
            let _guard = runtime.enter();
            Engine::start(Arc::new(MemoryStore::new()), config).map_err(to_py_err)?
        };
        Ok(Self { runtime, engine })
    }

    #[pyo3(signature = (name, settings_json=None))]
    fn register_learner(&self, name: String, settings_json: Option<String>) -> PyResult<String> {
        let settings = match settings_json {
            Some(json) => from_json::<LearnerSettings>(&json)?,
            None => LearnerSettings::default(),
        };
        let learner = self
            .runtime
            .block_on(self.engine.register_learner(&name, settings))
            .map_err(to_py_err)?;
        Ok(learner.id.to_string())
    }

    fn ingest(&self, learner_id: &str, text: &str) -> PyResult<String> {
        let id = parse_id(learner_id)?;
        let summary = self.runtime.block_on(self.engine.ingest(id, text)).map_err(to_py_err)?;
        to_json(&summary)
    }

    fn words(&self, learner_id: &str) -> PyResult<String> {
        let id = parse_id(learner_id)?;
        to_json(&self.runtime.block_on(self.engine.words(id)).map_err(to_py_err)?)
    }

    fn record_result(&self, word_id: &str, is_correct: bool, is_review: bool) -> PyResult<String> {
        let id = parse_id(word_id)?;
        let word = self
            .runtime
            .block_on(self.engine.record_result(id, is_correct, is_review))
            .map_err(to_py_err)?;
        to_json(&word)
    }

    fn force_master(&self, word_id: &str) -> PyResult<String> {
        let id = parse_id(word_id)?;
        to_json(&self.runtime.block_on(self.engine.force_master(id)).map_err(to_py_err)?)
    }

    fn readiness(&self, learner_id: &str) -> PyResult<String> {
        let id = parse_id(learner_id)?;
        to_json(&self.runtime.block_on(self.engine.readiness(id)).map_err(to_py_err)?)
    }

    fn prioritized_words(&self, learner_id: &str, book_id: &str) -> PyResult<String> {
        let (learner, book) = (parse_id(learner_id)?, parse_id(book_id)?);
        let ranked = self
            .runtime
            .block_on(self.engine.prioritized_words(learner, book))
            .map_err(to_py_err)?;
        to_json(&ranked)
    }

    fn practice_deck(&self, learner_id: &str, book_id: &str) -> PyResult<String> {
        let (learner, book) = (parse_id(learner_id)?, parse_id(book_id)?);
        let deck = self
            .runtime
            .block_on(self.engine.practice_deck(learner, book))
            .map_err(to_py_err)?;
        to_json(&deck)
    }

    /// `book_json` is a NewBook: {"title": ..., "words": [...], ...}
    fn create_book(&self, book_json: &str) -> PyResult<String> {
        let new_book: NewBook = from_json(book_json)?;
        to_json(&self.runtime.block_on(self.engine.create_book(new_book)).map_err(to_py_err)?)
    }

    fn append_book_text(&self, book_id: &str, text: &str) -> PyResult<String> {
        let id = parse_id(book_id)?;
        let appended = self
            .runtime
            .block_on(self.engine.append_book_text(id, text))
            .map_err(to_py_err)?;
        to_json(&appended)
    }

    fn delete_book(&self, book_id: &str) -> PyResult<String> {
        let id = parse_id(book_id)?;
        to_json(&self.runtime.block_on(self.engine.delete_book(id)).map_err(to_py_err)?)
    }

    fn resync_global_stats(&self) -> PyResult<String> {
        to_json(&self.runtime.block_on(self.engine.resync_global_stats()).map_err(to_py_err)?)
    }

    /// Resync requests not yet applied to the statistics index
    fn resync_lag(&self) -> u64 {
        self.engine.resync_handle().lag()
    }
}

#[pymodule]
fn rust_vocab_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_text, m)?)?;
    m.add_function(wrap_pyfunction!(validate_word, m)?)?;
    m.add_function(wrap_pyfunction!(leverage_score, m)?)?;
    m.add_class::<PyEngine>()?;
    Ok(())
}
