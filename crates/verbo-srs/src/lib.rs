//! SRS (Spaced Repetition System) engine for Verbo
//!
//! This crate decides when a learner's practice item (a verb/tense/mood
//! combination) is next due, how a graded attempt moves its easiness factor
//! and interval, how mastery of a topic is derived from its review records,
//! and which difficulty tier the next batch of items should use.
//!
//! Everything here is a pure function over its inputs except [`SrsEngine`],
//! which adds one round trip to a [`RecordStore`]. Time is always injected by
//! the caller.

pub mod config;
pub mod difficulty;
pub mod due;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod record;
pub mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use difficulty::{Adjustment, DifficultyAdvice, DifficultyTier};
pub use due::{DueQuery, NewItems};
pub use engine::{GradeInput, GradeOutcome, SrsEngine};
pub use error::{
    ConfigError, DueDateOverflowError, InvalidQualityError, SrsError, Staleness, StoreError,
};
pub use mastery::{Mastery, ReviewSummary, TopicMastery};
pub use record::{
    ItemId, LearnerId, Mood, ParseKeywordError, Quality, ReviewRecord, ReviewState, Tense,
    TopicFilter, TopicKey,
};
pub use scheduler::{ReviewPreview, Scheduler};
pub use store::{AttemptLogEntry, InMemoryStore, RecordStore};
