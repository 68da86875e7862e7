use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verbo_srs::{
    AttemptLogEntry, DifficultyTier, ItemId, LearnerId, ReviewRecord, StoreError, TopicKey,
};

/// One row of `review_records`.
///
/// Postgres has no unsigned integers, so counters are stored as `INTEGER`
/// and the version as `BIGINT`. Converting back into a [`ReviewRecord`]
/// fails with [`StoreError::Corrupt`] if a row holds values the engine
/// could never have written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewRecordRow {
    pub learner_id: Uuid,
    pub item_id: String,
    pub verb: String,
    pub tense: String,
    pub mood: String,
    pub repetition_count: i32,
    pub easiness_factor: f64,
    pub interval_days: i32,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub lapse_count: i32,
    pub state: String,
    pub version: i64,
}

fn corrupt(field: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("review_records.{field}: {detail}"))
}

fn to_i32(field: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| corrupt(field, format!("{value} does not fit a column")))
}

impl TryFrom<&ReviewRecord> for ReviewRecordRow {
    type Error = StoreError;

    fn try_from(record: &ReviewRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            learner_id: record.learner_id.0,
            item_id: record.item_id.as_str().to_string(),
            verb: record.topic.verb.clone(),
            tense: record.topic.tense.as_str().to_string(),
            mood: record.topic.mood.as_str().to_string(),
            repetition_count: to_i32("repetition_count", record.repetition_count)?,
            easiness_factor: record.easiness_factor,
            interval_days: to_i32("interval_days", record.interval_days)?,
            due_at: record.due_at,
            last_reviewed_at: record.last_reviewed_at,
            lapse_count: to_i32("lapse_count", record.lapse_count)?,
            state: record.state.as_str().to_string(),
            version: i64::try_from(record.version)
                .map_err(|_| corrupt("version", record.version))?,
        })
    }
}

impl TryFrom<ReviewRecordRow> for ReviewRecord {
    type Error = StoreError;

    fn try_from(row: ReviewRecordRow) -> Result<Self, Self::Error> {
        let topic = TopicKey {
            verb: row.verb,
            tense: row.tense.parse().map_err(|err| corrupt("tense", err))?,
            mood: row.mood.parse().map_err(|err| corrupt("mood", err))?,
        };

        Ok(Self {
            learner_id: LearnerId(row.learner_id),
            item_id: ItemId::new(row.item_id),
            topic,
            repetition_count: u32::try_from(row.repetition_count)
                .map_err(|_| corrupt("repetition_count", row.repetition_count))?,
            easiness_factor: row.easiness_factor,
            interval_days: u32::try_from(row.interval_days)
                .map_err(|_| corrupt("interval_days", row.interval_days))?,
            due_at: row.due_at,
            last_reviewed_at: row.last_reviewed_at,
            lapse_count: u32::try_from(row.lapse_count)
                .map_err(|_| corrupt("lapse_count", row.lapse_count))?,
            state: row.state.parse().map_err(|err| corrupt("state", err))?,
            version: u64::try_from(row.version).map_err(|_| corrupt("version", row.version))?,
        })
    }
}

/// One row of `review_attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttemptRow {
    pub learner_id: Uuid,
    pub item_id: String,
    pub quality: i16,
    pub success: bool,
    pub graded_at: DateTime<Utc>,
}

impl From<&AttemptLogEntry> for AttemptRow {
    fn from(entry: &AttemptLogEntry) -> Self {
        Self {
            learner_id: entry.learner_id.0,
            item_id: entry.item_id.as_str().to_string(),
            quality: i16::from(entry.quality),
            success: entry.success,
            graded_at: entry.graded_at,
        }
    }
}

impl TryFrom<AttemptRow> for AttemptLogEntry {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            learner_id: LearnerId(row.learner_id),
            item_id: ItemId::new(row.item_id),
            quality: u8::try_from(row.quality).map_err(|_| {
                StoreError::Corrupt(format!("review_attempts.quality: {}", row.quality))
            })?,
            success: row.success,
            graded_at: row.graded_at,
        })
    }
}

pub fn parse_tier(value: &str) -> Result<DifficultyTier, StoreError> {
    value
        .parse()
        .map_err(|err| StoreError::Corrupt(format!("learner_tiers.tier: {err}")))
}
