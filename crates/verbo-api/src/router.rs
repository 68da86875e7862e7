use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use verbo_srs::RecordStore;

use crate::{learner, state::ApiState};

pub fn router<S>() -> Router<ApiState<S>>
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .merge(learner::routes::<S>())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
