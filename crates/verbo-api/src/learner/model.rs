use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use verbo_srs::{DifficultyTier, DueQuery, ItemId, Mood, NewItems, Tense, TopicFilter, TopicKey};

use crate::{
    error::ApiError,
    validation::{parse_candidates, validate_verb},
};

/// Body of a graded attempt
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GradeRequest {
    /// Topic of the item, used when the learner has no record for it yet
    #[validate(length(min = 1, max = 64))]
    pub verb: String,
    pub tense: Tense,
    pub mood: Mood,
    /// Range-checked by the engine, so out-of-range values get a 422
    pub quality: i64,
    /// Defaults to the time the request is handled
    pub timestamp: Option<DateTime<Utc>>,
    pub expected_version: Option<u64>,
}

impl GradeRequest {
    pub fn topic(&self) -> Result<TopicKey, ApiError> {
        validate_verb(&self.verb)?;
        Ok(TopicKey::new(self.verb.clone(), self.tense, self.mood))
    }
}

/// Topic of an item that may not have a record yet
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PreviewParams {
    #[validate(length(min = 1, max = 64))]
    pub verb: String,
    pub tense: Tense,
    pub mood: Mood,
    pub at: Option<DateTime<Utc>>,
}

/// Evaluation time for read-only queries, defaulting to now
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsOfParams {
    pub at: Option<DateTime<Utc>>,
}

impl AsOfParams {
    pub fn now(&self) -> DateTime<Utc> {
        self.at.unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DueParams {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<usize>,
    #[validate(length(min = 1, max = 64))]
    pub verb: Option<String>,
    pub tense: Option<Tense>,
    pub mood: Option<Mood>,
    /// Comma separated item ids offered as new material
    pub candidates: Option<String>,
    pub new_items: Option<NewItems>,
    #[validate(range(max = 500))]
    pub max_new: Option<usize>,
    pub at: Option<DateTime<Utc>>,
}

impl DueParams {
    pub fn into_query(self) -> Result<DueQuery, ApiError> {
        self.validate()?;

        let candidates = self
            .candidates
            .as_deref()
            .map(parse_candidates)
            .transpose()?
            .unwrap_or_default();

        Ok(DueQuery {
            limit: self.limit,
            topic: TopicFilter {
                verb: self.verb,
                tense: self.tense,
                mood: self.mood,
            },
            candidates,
            new_items: self.new_items.unwrap_or_default(),
            max_new: self.max_new,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueResponse {
    pub items: Vec<ItemId>,
    pub count: usize,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct WindowParams {
    #[validate(range(min = 1, max = 500))]
    pub window: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTierRequest {
    pub tier: DifficultyTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_params_into_query() {
        let params = DueParams {
            limit: Some(10),
            mood: Some(Mood::Subjunctive),
            candidates: Some("b,a".to_string()),
            new_items: Some(NewItems::Exclude),
            ..DueParams::default()
        };

        let query = params.into_query().unwrap();
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.topic.mood, Some(Mood::Subjunctive));
        assert_eq!(query.topic.verb, None);
        assert_eq!(query.candidates.len(), 2);
        assert_eq!(query.new_items, NewItems::Exclude);
    }

    #[test]
    fn test_due_params_limits() {
        let params = DueParams {
            limit: Some(0),
            ..DueParams::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::Validation(_))));

        let params = DueParams {
            limit: Some(501),
            ..DueParams::default()
        };
        assert!(params.into_query().is_err());

        assert_eq!(
            DueParams::default().into_query().unwrap(),
            DueQuery::default()
        );
    }

    #[test]
    fn test_grade_request_topic() {
        let request = GradeRequest {
            verb: "a/b".to_string(),
            tense: Tense::Present,
            mood: Mood::Imperative,
            quality: 3,
            timestamp: None,
            expected_version: None,
        };
        assert!(request.topic().is_err());
    }
}
