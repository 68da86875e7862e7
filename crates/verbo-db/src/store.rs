//! [`RecordStore`] backed by PostgreSQL.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use verbo_srs::{
    AttemptLogEntry, DifficultyTier, ItemId, LearnerId, Mood, RecordStore, ReviewRecord,
    StoreError, Tense, TopicFilter,
};

use crate::{
    models::{AttemptRow, ReviewRecordRow, parse_tier},
    repositories::{attempts, reviews, reviews::TopicParams, tiers},
};

/// Stores review records, the attempt log and learner tiers in Postgres.
///
/// Timestamps are kept at the microsecond precision of `TIMESTAMPTZ`. Records
/// produced by the engine already are; finer timestamps written directly do not
/// load back identical.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete attempt log entries graded before `cutoff`.
    pub async fn prune_attempts(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        attempts::prune_attempts_before(&self.pool, cutoff)
            .await
            .map_err(StoreError::backend)
    }
}

fn topic_params(filter: &TopicFilter) -> TopicParams<'_> {
    TopicParams {
        verb: filter.verb.as_deref(),
        tense: filter.tense.map(Tense::as_str),
        mood: filter.mood.map(Mood::as_str),
    }
}

fn into_records(rows: Vec<ReviewRecordRow>) -> Result<Vec<ReviewRecord>, StoreError> {
    rows.into_iter().map(ReviewRecord::try_from).collect()
}

/// Insert or conditionally update one record on `conn`.
async fn write_record(
    conn: &mut PgConnection,
    row: &ReviewRecordRow,
    expected_version: u64,
) -> Result<(), StoreError> {
    let written = match i64::try_from(expected_version) {
        Ok(0) => reviews::insert_record(&mut *conn, row).await,
        Ok(expected) => reviews::update_record(&mut *conn, row, expected).await,
        // No stored version can be this large
        Err(_) => Ok(false),
    }
    .map_err(StoreError::backend)?;

    if written {
        return Ok(());
    }

    let found = reviews::get_version(&mut *conn, row.learner_id, &row.item_id)
        .await
        .map_err(StoreError::backend)?
        .and_then(|version| u64::try_from(version).ok())
        .unwrap_or(0);
    tracing::debug!(
        learner_id = %row.learner_id,
        item_id = %row.item_id,
        expected_version,
        found,
        "Conditional record write lost"
    );
    Err(StoreError::Stale {
        expected: expected_version,
        found,
    })
}

impl RecordStore for PgRecordStore {
    async fn get(
        &self,
        learner_id: LearnerId,
        item_id: &ItemId,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        reviews::get_record(&self.pool, learner_id.0, item_id.as_str())
            .await
            .map_err(StoreError::backend)?
            .map(ReviewRecord::try_from)
            .transpose()
    }

    async fn save(&self, record: &ReviewRecord, expected_version: u64) -> Result<(), StoreError> {
        let row = ReviewRecordRow::try_from(record)?;
        let mut conn = self.pool.acquire().await.map_err(StoreError::backend)?;
        write_record(&mut conn, &row, expected_version).await
    }

    async fn list_due(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
        filter: &TopicFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        let limit = limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let rows = reviews::list_due(&self.pool, learner_id.0, now, topic_params(filter), limit)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn list_records(
        &self,
        learner_id: LearnerId,
        filter: &TopicFilter,
    ) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = reviews::list_records(&self.pool, learner_id.0, topic_params(filter))
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn existing_items(
        &self,
        learner_id: LearnerId,
        candidates: &[ItemId],
    ) -> Result<HashSet<ItemId>, StoreError> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<String> = candidates
            .iter()
            .map(|item| item.as_str().to_string())
            .collect();

        let existing = reviews::existing_item_ids(&self.pool, learner_id.0, &ids)
            .await
            .map_err(StoreError::backend)?;
        Ok(existing.into_iter().map(ItemId::new).collect())
    }

    async fn append_attempt(&self, entry: &AttemptLogEntry) -> Result<(), StoreError> {
        attempts::insert_attempt(&self.pool, &AttemptRow::from(entry))
            .await
            .map_err(StoreError::backend)
    }

    async fn recent_attempts(
        &self,
        learner_id: LearnerId,
        limit: usize,
    ) -> Result<Vec<AttemptLogEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        attempts::recent_attempts(&self.pool, learner_id.0, limit)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(AttemptLogEntry::try_from)
            .collect()
    }

    async fn current_tier(
        &self,
        learner_id: LearnerId,
    ) -> Result<Option<DifficultyTier>, StoreError> {
        tiers::get_tier(&self.pool, learner_id.0)
            .await
            .map_err(StoreError::backend)?
            .as_deref()
            .map(parse_tier)
            .transpose()
    }

    async fn set_tier(&self, learner_id: LearnerId, tier: DifficultyTier) -> Result<(), StoreError> {
        tiers::upsert_tier(&self.pool, learner_id.0, tier.as_str())
            .await
            .map_err(StoreError::backend)
    }

    /// Record write and attempt log entry in one transaction.
    async fn commit_review(
        &self,
        record: &ReviewRecord,
        expected_version: u64,
        entry: &AttemptLogEntry,
    ) -> Result<(), StoreError> {
        let row = ReviewRecordRow::try_from(record)?;
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        write_record(&mut tx, &row, expected_version).await?;
        attempts::insert_attempt(&mut *tx, &AttemptRow::from(entry))
            .await
            .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)
    }
}
