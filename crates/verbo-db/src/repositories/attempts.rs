use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::AttemptRow;

pub async fn insert_attempt<'e, E>(executor: E, row: &AttemptRow) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO review_attempts (learner_id, item_id, quality, success, graded_at)
            VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(row.learner_id)
    .bind(&row.item_id)
    .bind(row.quality)
    .bind(row.success)
    .bind(row.graded_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Newest attempts first. Attempts graded at the same instant come back in
/// reverse insertion order.
pub async fn recent_attempts<'e, E>(
    executor: E,
    learner_id: Uuid,
    limit: i64,
) -> Result<Vec<AttemptRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, quality, success, graded_at
            FROM review_attempts
            WHERE learner_id = $1
            ORDER BY graded_at DESC, id DESC
            LIMIT $2
        "#,
    )
    .bind(learner_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Delete attempts graded before `cutoff`. Returns the number of rows removed.
pub async fn prune_attempts_before<'e, E>(
    executor: E,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM review_attempts
            WHERE graded_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
