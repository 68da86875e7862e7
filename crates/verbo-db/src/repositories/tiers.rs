use sqlx::{Executor, Postgres};
use uuid::Uuid;

pub async fn get_tier<'e, E>(executor: E, learner_id: Uuid) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT tier
            FROM learner_tiers
            WHERE learner_id = $1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

pub async fn upsert_tier<'e, E>(executor: E, learner_id: Uuid, tier: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO learner_tiers (learner_id, tier)
            VALUES ($1, $2)
            ON CONFLICT (learner_id)
            DO UPDATE SET tier = $2, updated_at = NOW()
        "#,
    )
    .bind(learner_id)
    .bind(tier)
    .execute(executor)
    .await?;
    Ok(())
}
