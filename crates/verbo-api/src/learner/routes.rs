use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;
use verbo_srs::{
    DifficultyAdvice, GradeInput, GradeOutcome, ItemId, LearnerId, Mastery, RecordStore,
    ReviewPreview, ReviewRecord, ReviewSummary, SrsError, TopicKey, TopicMastery,
};

use super::model::{
    AsOfParams, DueParams, DueResponse, GradeRequest, PreviewParams, SetTierRequest, WindowParams,
};
use crate::{
    error::ApiError,
    metrics,
    state::ApiState,
    validation::{parse_topic, validate_item_id},
};

/// Create the learner routes
pub fn routes<S>() -> Router<ApiState<S>>
where
    S: RecordStore + 'static,
{
    Router::new()
        .route(
            "/learners/{learner_id}/items/{item_id}/attempts",
            post(grade_attempt::<S>),
        )
        .route("/learners/{learner_id}/items/{item_id}", get(get_record::<S>))
        .route(
            "/learners/{learner_id}/items/{item_id}/preview",
            get(preview::<S>),
        )
        .route("/learners/{learner_id}/due", get(due_items::<S>))
        .route("/learners/{learner_id}/mastery", get(mastery_overview::<S>))
        .route(
            "/learners/{learner_id}/mastery/{verb}/{tense}/{mood}",
            get(topic_mastery::<S>),
        )
        .route("/learners/{learner_id}/summary", get(review_summary::<S>))
        .route(
            "/learners/{learner_id}/difficulty",
            get(recommend_difficulty::<S>).put(set_tier::<S>),
        )
}

/// Apply one graded attempt to the learner's record for the item
async fn grade_attempt<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path((learner_id, item_id)): Path<(Uuid, String)>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeOutcome>, ApiError> {
    validate_item_id(&item_id)?;
    payload.validate()?;

    let input = GradeInput {
        learner_id: LearnerId(learner_id),
        item_id: ItemId::new(item_id),
        topic: payload.topic()?,
        quality: payload.quality,
        timestamp: payload.timestamp.unwrap_or_else(Utc::now),
        expected_version: payload.expected_version,
    };

    match state.engine.grade_attempt(input).await {
        Ok(outcome) => {
            metrics::record_grade(&outcome);
            Ok(Json(outcome))
        }
        Err(err) => {
            match &err {
                SrsError::InvalidQuality(_) => metrics::record_grade_rejected("invalid_quality"),
                SrsError::StaleRecord { .. } => metrics::record_grade_rejected("stale"),
                SrsError::DueDateOverflow(_) => metrics::record_grade_rejected("out_of_range"),
                SrsError::Store(_) => {}
            }
            Err(err.into())
        }
    }
}

async fn get_record<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path((learner_id, item_id)): Path<(Uuid, String)>,
) -> Result<Json<ReviewRecord>, ApiError> {
    validate_item_id(&item_id)?;
    let item_id = ItemId::new(item_id);

    state
        .engine
        .get_record(LearnerId(learner_id), &item_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No review record for item '{item_id}'")))
}

/// Outcome of every quality for the item, without grading it
async fn preview<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path((learner_id, item_id)): Path<(Uuid, String)>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<Vec<ReviewPreview>>, ApiError> {
    validate_item_id(&item_id)?;
    params.validate()?;
    let topic = parse_topic(&params.verb, params.tense.as_str(), params.mood.as_str())?;
    let now = params.at.unwrap_or_else(Utc::now);

    let previews = state
        .engine
        .preview(LearnerId(learner_id), &ItemId::new(item_id), &topic, now)
        .await?;
    Ok(Json(previews))
}

async fn due_items<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path(learner_id): Path<Uuid>,
    Query(params): Query<DueParams>,
) -> Result<Json<DueResponse>, ApiError> {
    let as_of = params.at.unwrap_or_else(Utc::now);
    let query = params.into_query()?;

    let items = state
        .engine
        .get_due_items(LearnerId(learner_id), as_of, &query)
        .await?;
    Ok(Json(DueResponse {
        count: items.len(),
        items,
        as_of,
    }))
}

async fn mastery_overview<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path(learner_id): Path<Uuid>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<Vec<TopicMastery>>, ApiError> {
    let overview = state
        .engine
        .mastery_overview(LearnerId(learner_id), params.now())
        .await?;
    Ok(Json(overview))
}

async fn topic_mastery<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path((learner_id, verb, tense, mood)): Path<(Uuid, String, String, String)>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<Mastery>, ApiError> {
    let topic: TopicKey = parse_topic(&verb, &tense, &mood)?;

    let mastery = state
        .engine
        .get_mastery(LearnerId(learner_id), &topic, params.now())
        .await?;
    Ok(Json(mastery))
}

async fn review_summary<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path(learner_id): Path<Uuid>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<ReviewSummary>, ApiError> {
    let summary = state
        .engine
        .review_summary(LearnerId(learner_id), params.now())
        .await?;
    Ok(Json(summary))
}

async fn recommend_difficulty<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path(learner_id): Path<Uuid>,
    Query(params): Query<WindowParams>,
) -> Result<Json<DifficultyAdvice>, ApiError> {
    params.validate()?;

    let advice = state
        .engine
        .recommend_difficulty(LearnerId(learner_id), params.window)
        .await?;
    Ok(Json(advice))
}

/// Record the tier the learner practices at from now on
async fn set_tier<S: RecordStore>(
    State(state): State<ApiState<S>>,
    Path(learner_id): Path<Uuid>,
    Json(payload): Json<SetTierRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .set_tier(LearnerId(learner_id), payload.tier)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
