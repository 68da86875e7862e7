use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AttemptLogEntry, RecordStore};
use crate::{
    difficulty::DifficultyTier,
    due::compare_due,
    error::StoreError,
    record::{ItemId, LearnerId, ReviewRecord, TopicFilter},
};

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<(LearnerId, ItemId), ReviewRecord>,
    /// Oldest first
    attempts: HashMap<LearnerId, Vec<AttemptLogEntry>>,
    tiers: HashMap<LearnerId, DifficultyTier>,
}

impl Tables {
    fn check_version(&self, record: &ReviewRecord, expected: u64) -> Result<(), StoreError> {
        let found = self
            .records
            .get(&(record.learner_id, record.item_id.clone()))
            .map_or(0, |stored| stored.version);

        if found == expected {
            Ok(())
        } else {
            Err(StoreError::Stale { expected, found })
        }
    }

    fn put(&mut self, record: &ReviewRecord) {
        self.records
            .insert((record.learner_id, record.item_id.clone()), record.clone());
    }

    fn log(&mut self, entry: &AttemptLogEntry) {
        self.attempts
            .entry(entry.learner_id)
            .or_default()
            .push(entry.clone());
    }

    fn learner_records<'a>(
        &'a self,
        learner_id: LearnerId,
        filter: &'a TopicFilter,
    ) -> impl Iterator<Item = &'a ReviewRecord> + 'a {
        self.records
            .values()
            .filter(move |record| record.learner_id == learner_id && filter.matches(&record.topic))
    }
}

/// Record store kept in process memory.
///
/// Used by tests and local runs; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryStore {
    async fn get(
        &self,
        learner_id: LearnerId,
        item_id: &ItemId,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.records.get(&(learner_id, item_id.clone())).cloned())
    }

    async fn save(&self, record: &ReviewRecord, expected_version: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_version(record, expected_version)?;
        tables.put(record);
        Ok(())
    }

    async fn list_due(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
        filter: &TopicFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut due: Vec<ReviewRecord> = tables
            .learner_records(learner_id, filter)
            .filter(|record| record.is_due(now))
            .cloned()
            .collect();
        due.sort_by(compare_due);
        due.truncate(limit.unwrap_or(usize::MAX));
        Ok(due)
    }

    async fn list_records(
        &self,
        learner_id: LearnerId,
        filter: &TopicFilter,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut records: Vec<ReviewRecord> =
            tables.learner_records(learner_id, filter).cloned().collect();
        records.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(records)
    }

    async fn existing_items(
        &self,
        learner_id: LearnerId,
        candidates: &[ItemId],
    ) -> Result<HashSet<ItemId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(candidates
            .iter()
            .filter(|item| tables.records.contains_key(&(learner_id, (*item).clone())))
            .cloned()
            .collect())
    }

    async fn append_attempt(&self, entry: &AttemptLogEntry) -> Result<(), StoreError> {
        self.tables.write().await.log(entry);
        Ok(())
    }

    async fn recent_attempts(
        &self,
        learner_id: LearnerId,
        limit: usize,
    ) -> Result<Vec<AttemptLogEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .get(&learner_id)
            .map(|log| log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn current_tier(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<DifficultyTier>, StoreError> {
        Ok(self.tables.read().await.tiers.get(&learner_id).copied())
    }

    async fn set_tier(&self, learner_id: LearnerId, tier: DifficultyTier) -> Result<(), StoreError> {
        self.tables.write().await.tiers.insert(learner_id, tier);
        Ok(())
    }

    async fn commit_review(
        &self,
        record: &ReviewRecord,
        expected_version: u64,
        entry: &AttemptLogEntry,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_version(record, expected_version)?;
        tables.put(record);
        tables.log(entry);
        Ok(())
    }
}
