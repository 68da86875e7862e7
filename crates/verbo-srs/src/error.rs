use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::{ItemId, LearnerId};

/// A quality signal outside `0..=5` was supplied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("quality signal {0} is outside the range 0..=5")]
pub struct InvalidQualityError(pub i64);

/// Scheduling a review would put its due date past the last representable instant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("due date of a review at {reviewed_at} plus {interval_days} days is out of range")]
pub struct DueDateOverflowError {
    pub reviewed_at: DateTime<Utc>,
    pub interval_days: u32,
}

/// Why a grade was rejected as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The stored record's version differs from the one the update was computed against.
    VersionMismatch { expected: u64, found: u64 },
    /// The attempt happened before the record's last review.
    OutOfOrder {
        last_reviewed_at: DateTime<Utc>,
        attempted_at: DateTime<Utc>,
    },
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionMismatch { expected, found } => {
                write!(f, "expected version {expected}, found {found}")
            }
            Self::OutOfOrder {
                last_reviewed_at,
                attempted_at,
            } => write!(
                f,
                "attempt at {attempted_at} predates last review at {last_reviewed_at}"
            ),
        }
    }
}

/// Errors surfaced by a [`RecordStore`](crate::store::RecordStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The stored version is not the expected one.
    #[error("version conflict: expected {expected}, found {found}")]
    Stale { expected: u64, found: u64 },
    /// A stored row does not decode into a valid record.
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error("record store failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an opaque backend error (connection loss, timeout, ...).
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Errors returned by the engine operations.
#[derive(Error, Debug)]
pub enum SrsError {
    #[error(transparent)]
    InvalidQuality(#[from] InvalidQualityError),
    #[error("stale review record for learner {learner_id}, item {item_id}: {staleness}")]
    StaleRecord {
        learner_id: LearnerId,
        item_id: ItemId,
        staleness: Staleness,
    },
    #[error(transparent)]
    DueDateOverflow(#[from] DueDateOverflowError),
    #[error(transparent)]
    Store(StoreError),
}

impl SrsError {
    /// Map a store error for the given record, turning version conflicts into
    /// [`SrsError::StaleRecord`].
    pub(crate) fn from_store(err: StoreError, learner_id: LearnerId, item_id: &ItemId) -> Self {
        match err {
            StoreError::Stale { expected, found } => Self::StaleRecord {
                learner_id,
                item_id: item_id.clone(),
                staleness: Staleness::VersionMismatch { expected, found },
            },
            other => Self::Store(other),
        }
    }
}

impl From<StoreError> for SrsError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Invalid engine tunables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    // Variants mirror the checks in `EngineConfig::validate`.
    #[error("mastery threshold must be at least 1")]
    ZeroMasteryThreshold,
    #[error("minimum easiness must be positive and not above the initial easiness ({min} > {initial})")]
    EasinessOrder { min: f64, initial: f64 },
    #[error("easiness ceiling {ceiling} must be above the minimum easiness {min}")]
    EasinessCeiling { ceiling: f64, min: f64 },
    #[error("accuracy thresholds must satisfy 0 <= demote ({demote}) < promote ({promote}) <= 1")]
    AccuracyThresholds { demote: f64, promote: f64 },
    #[error("difficulty window must be at least 1 attempt")]
    EmptyWindow,
    #[error("maximum interval must be at least 1 day")]
    ZeroMaxInterval,
}
