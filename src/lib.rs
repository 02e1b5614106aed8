//! Vocabulary mastery and prioritization engine for reading practice.
//!
//! Raw OCR text from photographed book pages is cleaned into candidate
//! words ([`normalizer`]), recorded per learner ([`vocabulary`]) and
//! promoted through a mastery state machine by practice results
//! ([`mastery`]). A cross-book statistics index ([`stats`]), refreshed in
//! the background after book writes ([`resync`]), ranks each learner's
//! unmastered words by how widely they are used ([`readiness`]).
//!
//! [`Engine`] ties these together over any [`store::Store`] backend.

pub mod books;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod mastery;
pub mod model;
pub mod normalizer;
pub mod readiness;
pub mod resync;
pub mod stats;
pub mod store;
pub mod validator;
pub mod vocabulary;

#[cfg(feature = "python")]
mod python;

pub use config::{EngineConfig, LearnerSettings, NormalizerConfig, ResyncConfig, ValidationMode};
pub use engine::{Engine, IngestSummary, RepeatedWord};
pub use error::{EngineError, Result, StoreError};
pub use mastery::{PracticeContext, PracticeResult};
pub use model::{
    ApprovalStatus, Book, BookId, BookPatch, BookReadiness, BookSource, GlobalWordStats, Learner, LearnerId,
    NewBook, PrioritizedWord, Word, WordId, WordStatus,
};
pub use normalizer::{NormalizeOptions, NormalizedText, TextNormalizer};
pub use stats::{ResyncReport, leverage_score};
pub use store::{MemoryStore, Store};
pub use validator::{Rejection, ShapeValidator, WordValidator};
