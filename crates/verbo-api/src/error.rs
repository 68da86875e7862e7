use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use verbo_srs::{SrsError, StoreError};

use crate::metrics;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Srs(#[from] SrsError),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Srs(SrsError::InvalidQuality(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Srs(SrsError::StaleRecord { .. }) => StatusCode::CONFLICT,
            Self::Srs(SrsError::DueDateOverflow(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Srs(SrsError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Srs(SrsError::InvalidQuality(_)) => "INVALID_QUALITY",
            Self::Srs(SrsError::StaleRecord { .. }) => "STALE_RECORD",
            Self::Srs(SrsError::DueDateOverflow(_)) => "TIMESTAMP_OUT_OF_RANGE",
            Self::Srs(SrsError::Store(_)) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Srs(SrsError::Store(err)) => {
                let kind = match err {
                    StoreError::Stale { .. } => "stale",
                    StoreError::Corrupt(_) => "corrupt",
                    StoreError::Backend(_) => "backend",
                };
                metrics::record_store_error(kind);
                tracing::error!(error = %err, kind, "Record store failure");
                // Store internals stay in the logs
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbo_srs::{DueDateOverflowError, InvalidQualityError, ItemId, LearnerId, Staleness};

    #[test]
    fn test_status_mapping() {
        let invalid = ApiError::from(SrsError::from(InvalidQualityError(7)));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let stale = ApiError::from(SrsError::StaleRecord {
            learner_id: LearnerId(uuid::Uuid::nil()),
            item_id: ItemId::from("a"),
            staleness: Staleness::VersionMismatch {
                expected: 1,
                found: 2,
            },
        });
        assert_eq!(stale.status(), StatusCode::CONFLICT);
        assert_eq!(stale.code(), "STALE_RECORD");

        let store = ApiError::from(SrsError::Store(StoreError::Corrupt("bad".into())));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let overflow = ApiError::from(SrsError::from(DueDateOverflowError {
            reviewed_at: chrono::DateTime::<chrono::Utc>::MAX_UTC,
            interval_days: 1,
        }));
        assert_eq!(overflow.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(overflow.code(), "TIMESTAMP_OUT_OF_RANGE");
        assert_eq!(
            ApiError::Validation("limit".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_details_are_hidden() {
        let response =
            ApiError::from(SrsError::Store(StoreError::Corrupt("secret".into()))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
