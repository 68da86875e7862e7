use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::ReviewRecordRow;

/// Topic filter as bind parameters; `None` matches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicParams<'a> {
    pub verb: Option<&'a str>,
    pub tense: Option<&'a str>,
    pub mood: Option<&'a str>,
}

pub async fn get_record<'e, E>(
    executor: E,
    learner_id: Uuid,
    item_id: &str,
) -> Result<Option<ReviewRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, verb, tense, mood, repetition_count, easiness_factor,
                   interval_days, due_at, last_reviewed_at, lapse_count, state, version
            FROM review_records
            WHERE learner_id = $1 AND item_id = $2
        "#,
    )
    .bind(learner_id)
    .bind(item_id)
    .fetch_optional(executor)
    .await
}

/// Stored version of a record, `None` when the learner has no record for the item.
pub async fn get_version<'e, E>(
    executor: E,
    learner_id: Uuid,
    item_id: &str,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT version
            FROM review_records
            WHERE learner_id = $1 AND item_id = $2
        "#,
    )
    .bind(learner_id)
    .bind(item_id)
    .fetch_optional(executor)
    .await
}

/// Insert a record nobody has stored yet. Returns `false` if one already exists.
pub async fn insert_record<'e, E>(executor: E, row: &ReviewRecordRow) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO review_records (learner_id, item_id, verb, tense, mood, repetition_count,
                                        easiness_factor, interval_days, due_at, last_reviewed_at,
                                        lapse_count, state, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (learner_id, item_id) DO NOTHING
        "#,
    )
    .bind(row.learner_id)
    .bind(&row.item_id)
    .bind(&row.verb)
    .bind(&row.tense)
    .bind(&row.mood)
    .bind(row.repetition_count)
    .bind(row.easiness_factor)
    .bind(row.interval_days)
    .bind(row.due_at)
    .bind(row.last_reviewed_at)
    .bind(row.lapse_count)
    .bind(&row.state)
    .bind(row.version)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrite a record only if its stored version is still `expected_version`.
/// Returns `false` when another writer got there first.
pub async fn update_record<'e, E>(
    executor: E,
    row: &ReviewRecordRow,
    expected_version: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE review_records
            SET verb = $3,
                tense = $4,
                mood = $5,
                repetition_count = $6,
                easiness_factor = $7,
                interval_days = $8,
                due_at = $9,
                last_reviewed_at = $10,
                lapse_count = $11,
                state = $12,
                version = $13,
                updated_at = NOW()
            WHERE learner_id = $1 AND item_id = $2 AND version = $14
        "#,
    )
    .bind(row.learner_id)
    .bind(&row.item_id)
    .bind(&row.verb)
    .bind(&row.tense)
    .bind(&row.mood)
    .bind(row.repetition_count)
    .bind(row.easiness_factor)
    .bind(row.interval_days)
    .bind(row.due_at)
    .bind(row.last_reviewed_at)
    .bind(row.lapse_count)
    .bind(&row.state)
    .bind(row.version)
    .bind(expected_version)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Records due at `now`, most overdue first, then lowest easiness, then item id
/// in byte order.
pub async fn list_due<'e, E>(
    executor: E,
    learner_id: Uuid,
    now: DateTime<Utc>,
    topic: TopicParams<'_>,
    limit: Option<i64>,
) -> Result<Vec<ReviewRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, verb, tense, mood, repetition_count, easiness_factor,
                   interval_days, due_at, last_reviewed_at, lapse_count, state, version
            FROM review_records
            WHERE learner_id = $1
              AND due_at <= $2
              AND ($3::TEXT IS NULL OR verb = $3)
              AND ($4::TEXT IS NULL OR tense = $4)
              AND ($5::TEXT IS NULL OR mood = $5)
            ORDER BY due_at ASC, easiness_factor ASC, item_id COLLATE "C" ASC
            LIMIT $6
        "#,
    )
    .bind(learner_id)
    .bind(now)
    .bind(topic.verb)
    .bind(topic.tense)
    .bind(topic.mood)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn list_records<'e, E>(
    executor: E,
    learner_id: Uuid,
    topic: TopicParams<'_>,
) -> Result<Vec<ReviewRecordRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, verb, tense, mood, repetition_count, easiness_factor,
                   interval_days, due_at, last_reviewed_at, lapse_count, state, version
            FROM review_records
            WHERE learner_id = $1
              AND ($2::TEXT IS NULL OR verb = $2)
              AND ($3::TEXT IS NULL OR tense = $3)
              AND ($4::TEXT IS NULL OR mood = $4)
            ORDER BY item_id COLLATE "C" ASC
        "#,
    )
    .bind(learner_id)
    .bind(topic.verb)
    .bind(topic.tense)
    .bind(topic.mood)
    .fetch_all(executor)
    .await
}

/// The subset of `item_ids` the learner already has a record for.
pub async fn existing_item_ids<'e, E>(
    executor: E,
    learner_id: Uuid,
    item_ids: &[String],
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT item_id
            FROM review_records
            WHERE learner_id = $1 AND item_id = ANY($2)
        "#,
    )
    .bind(learner_id)
    .bind(item_ids)
    .fetch_all(executor)
    .await
}
