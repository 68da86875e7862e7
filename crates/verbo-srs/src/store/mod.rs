//! The record store contract the engine persists through.
//!
//! Implementations must be safe to share between tasks. All futures they
//! return are `Send` so the engine can be driven from any tokio worker.

mod memory;

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    difficulty::DifficultyTier,
    error::StoreError,
    record::{ItemId, LearnerId, ReviewRecord, TopicFilter},
};

pub use memory::InMemoryStore;

/// One graded attempt, kept for the difficulty adviser's rolling window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLogEntry {
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    pub quality: u8,
    pub success: bool,
    pub graded_at: DateTime<Utc>,
}

/// Persistence for review records, the attempt log and difficulty tiers.
pub trait RecordStore: Send + Sync {
    /// Load the record for `(learner_id, item_id)`, if any.
    fn get(
        &self,
        learner_id: LearnerId,
        item_id: &ItemId,
    ) -> impl Future<Output = Result<Option<ReviewRecord>, StoreError>> + Send;

    /// Persist `record` if the stored version still equals `expected_version`
    /// (0 meaning "no record stored yet"). Fails with [`StoreError::Stale`]
    /// otherwise, leaving the stored record untouched.
    fn save(
        &self,
        record: &ReviewRecord,
        expected_version: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Records with `due_at <= now` matching `filter`, ordered by due date,
    /// then easiness factor, then item id.
    fn list_due(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
        filter: &TopicFilter,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<ReviewRecord>, StoreError>> + Send;

    /// Every record of the learner matching `filter`.
    fn list_records(
        &self,
        learner_id: LearnerId,
        filter: &TopicFilter,
    ) -> impl Future<Output = Result<Vec<ReviewRecord>, StoreError>> + Send;

    /// The subset of `candidates` the learner already has a record for.
    fn existing_items(
        &self,
        learner_id: LearnerId,
        candidates: &[ItemId],
    ) -> impl Future<Output = Result<HashSet<ItemId>, StoreError>> + Send;

    /// Add an entry to the learner's attempt log.
    fn append_attempt(
        &self,
        entry: &AttemptLogEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The learner's most recent attempts, newest first.
    fn recent_attempts(
        &self,
        learner_id: LearnerId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AttemptLogEntry>, StoreError>> + Send;

    /// The tier last set for the learner, if any.
    fn current_tier(
        &self,
        learner_id: LearnerId,
    ) -> impl Future<Output = Result<Option<DifficultyTier>, StoreError>> + Send;

    fn set_tier(
        &self,
        learner_id: LearnerId,
        tier: DifficultyTier,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Save a graded record and log the attempt that produced it.
    ///
    /// The default saves then appends; stores that can do both atomically
    /// should override it.
    fn commit_review(
        &self,
        record: &ReviewRecord,
        expected_version: u64,
        entry: &AttemptLogEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            self.save(record, expected_version).await?;
            self.append_attempt(entry).await
        }
    }
}
