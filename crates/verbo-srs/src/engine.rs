//! The operations the surrounding service calls.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::EngineConfig,
    difficulty::{self, DifficultyAdvice, DifficultyTier},
    due::{self, DueQuery},
    error::{SrsError, Staleness},
    mastery::{self, Mastery, ReviewSummary, TopicMastery},
    record::{ItemId, LearnerId, Quality, ReviewRecord, ReviewState, TopicFilter, TopicKey},
    scheduler::{ReviewPreview, Scheduler},
    store::{AttemptLogEntry, RecordStore},
};

/// A graded attempt handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeInput {
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    /// Topic used when the item has no record yet
    pub topic: TopicKey,
    /// Checked against `0..=5` before anything else happens
    pub quality: i64,
    /// When the attempt happened. Becomes `last_reviewed_at`.
    pub timestamp: DateTime<Utc>,
    /// When set, the grade only applies to this exact record version.
    pub expected_version: Option<u64>,
}

/// The persisted record after a grade, with how it got there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeOutcome {
    pub record: ReviewRecord,
    /// State before the grade, `new` for a first attempt
    pub previous_state: ReviewState,
    pub success: bool,
    /// A failure on an item that was in review or mastered.
    pub lapsed: bool,
}

/// Scheduling, due-set, mastery and difficulty operations over one record store.
#[derive(Debug, Clone)]
pub struct SrsEngine<S> {
    store: S,
    config: EngineConfig,
    scheduler: Scheduler,
}

impl<S: RecordStore> SrsEngine<S> {
    /// Build an engine over `store`. Validate `config` first.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let scheduler = Scheduler::new(config.clone());
        Self {
            store,
            config,
            scheduler,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply one graded attempt and persist the result.
    ///
    /// The quality is validated before the store is touched. The updated
    /// record is computed in full before the single save, and the save only
    /// succeeds against the version the update was computed from. The attempt
    /// timestamp is truncated to whole microseconds first.
    #[instrument(
        skip_all,
        fields(learner_id = %input.learner_id, item_id = %input.item_id, quality = input.quality)
    )]
    pub async fn grade_attempt(&self, mut input: GradeInput) -> Result<GradeOutcome, SrsError> {
        let quality = Quality::try_from(input.quality)?;
        // Stored timestamps keep microseconds, so the returned record matches a later read
        input.timestamp = input.timestamp.trunc_subsecs(6);

        let prior = match self.store.get(input.learner_id, &input.item_id).await? {
            Some(record) => {
                if record.topic != input.topic {
                    warn!(
                        stored_topic = %record.topic,
                        requested_topic = %input.topic,
                        "Grade names a different topic than the stored record, keeping the stored one"
                    );
                }
                record
            }
            None => {
                debug!("No record yet, starting from a new one");
                ReviewRecord::new(
                    input.learner_id,
                    input.item_id.clone(),
                    input.topic.clone(),
                    input.timestamp,
                    &self.config,
                )
            }
        };

        if let Some(expected) = input.expected_version
            && expected != prior.version
        {
            return Err(stale(
                &input,
                Staleness::VersionMismatch {
                    expected,
                    found: prior.version,
                },
            ));
        }
        if let Some(last_reviewed_at) = prior.last_reviewed_at
            && input.timestamp < last_reviewed_at
        {
            return Err(stale(
                &input,
                Staleness::OutOfOrder {
                    last_reviewed_at,
                    attempted_at: input.timestamp,
                },
            ));
        }

        let updated = self.scheduler.apply(&prior, quality, input.timestamp)?;
        let entry = AttemptLogEntry {
            learner_id: input.learner_id,
            item_id: input.item_id.clone(),
            quality: quality.value(),
            success: quality.is_success(),
            graded_at: input.timestamp,
        };

        self.store
            .commit_review(&updated, prior.version, &entry)
            .await
            .map_err(|err| SrsError::from_store(err, input.learner_id, &input.item_id))?;

        let lapsed = !quality.is_success()
            && matches!(prior.state, ReviewState::Review | ReviewState::Mastered);
        info!(
            state = %updated.state,
            interval_days = updated.interval_days,
            easiness_factor = updated.easiness_factor,
            lapsed,
            "Graded attempt"
        );

        Ok(GradeOutcome {
            previous_state: prior.state,
            success: quality.is_success(),
            lapsed,
            record: updated,
        })
    }

    /// The stored record, or `None` if the item was never graded.
    pub async fn get_record(
        &self,
        learner_id: LearnerId,
        item_id: &ItemId,
    ) -> Result<Option<ReviewRecord>, SrsError> {
        Ok(self.store.get(learner_id, item_id).await?)
    }

    /// What each quality would do to the item right now. Nothing is persisted.
    pub async fn preview(
        &self,
        learner_id: LearnerId,
        item_id: &ItemId,
        topic: &TopicKey,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewPreview>, SrsError> {
        let record = match self.store.get(learner_id, item_id).await? {
            Some(record) => record,
            None => ReviewRecord::new(
                learner_id,
                item_id.clone(),
                topic.clone(),
                now,
                &self.config,
            ),
        };
        Ok(self.scheduler.preview(&record, now)?)
    }

    /// Ordered item ids the learner should practice next.
    #[instrument(skip_all, fields(learner_id = %learner_id))]
    pub async fn get_due_items(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
        query: &DueQuery,
    ) -> Result<Vec<ItemId>, SrsError> {
        let records = self
            .store
            .list_due(learner_id, now, &query.topic, query.limit)
            .await?;

        let unseen: Vec<ItemId> = if query.candidates.is_empty() {
            Vec::new()
        } else {
            let existing = self
                .store
                .existing_items(learner_id, &query.candidates)
                .await?;
            query
                .candidates
                .iter()
                .filter(|item| !existing.contains(*item))
                .cloned()
                .collect()
        };

        let items = due::select_due(&records, &unseen, now, query);
        debug!(
            due_reviews = records.len(),
            new_candidates = unseen.len(),
            returned = items.len(),
            "Selected due items"
        );
        Ok(items)
    }

    /// Mastery of one topic, recomputed from its records.
    pub async fn get_mastery(
        &self,
        learner_id: LearnerId,
        topic: &TopicKey,
        now: DateTime<Utc>,
    ) -> Result<Mastery, SrsError> {
        let records = self
            .store
            .list_records(learner_id, &TopicFilter::exact(topic))
            .await?;
        Ok(mastery::aggregate(topic, &records, now, &self.config))
    }

    /// Mastery of every topic the learner has practiced.
    pub async fn mastery_overview(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<TopicMastery>, SrsError> {
        let records = self
            .store
            .list_records(learner_id, &TopicFilter::all())
            .await?;
        Ok(mastery::overview(&records, now, &self.config))
    }

    /// Counts of the learner's records per state.
    pub async fn review_summary(
        &self,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<ReviewSummary, SrsError> {
        let records = self
            .store
            .list_records(learner_id, &TopicFilter::all())
            .await?;
        Ok(ReviewSummary::from_records(&records, now))
    }

    /// Recommend the tier of the next batch from the learner's recent accuracy.
    ///
    /// `window_size` defaults to the configured window.
    #[instrument(skip_all, fields(learner_id = %learner_id, window_size = ?window_size))]
    pub async fn recommend_difficulty(
        &self,
        learner_id: LearnerId,
        window_size: Option<usize>,
    ) -> Result<DifficultyAdvice, SrsError> {
        let window = window_size.unwrap_or(self.config.window_size);
        let current = self
            .store
            .current_tier(learner_id)
            .await?
            .unwrap_or_default();
        let outcomes: Vec<bool> = self
            .store
            .recent_attempts(learner_id, window)
            .await?
            .iter()
            .map(|entry| entry.success)
            .collect();

        let advice = difficulty::advise(current, &outcomes, window, &self.config);
        debug!(
            current = %advice.current,
            recommended = %advice.recommended,
            sample_size = advice.sample_size,
            "Difficulty advice"
        );
        Ok(advice)
    }

    /// Record the tier the learner now practices at.
    pub async fn set_tier(
        &self,
        learner_id: LearnerId,
        tier: DifficultyTier,
    ) -> Result<(), SrsError> {
        self.store.set_tier(learner_id, tier).await?;
        info!(learner_id = %learner_id, tier = %tier, "Difficulty tier updated");
        Ok(())
    }
}

fn stale(input: &GradeInput, staleness: Staleness) -> SrsError {
    warn!(%staleness, "Rejected stale grade");
    SrsError::StaleRecord {
        learner_id: input.learner_id,
        item_id: input.item_id.clone(),
        staleness,
    }
}
