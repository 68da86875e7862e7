//! SM-2 style review scheduling.
//!
//! A [`Scheduler`] turns one review record and one graded attempt into the
//! updated record. It never touches storage: the full new record is computed
//! before anything is persisted, so dropping the result leaves no trace.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    config::EngineConfig,
    error::DueDateOverflowError,
    record::{Quality, ReviewRecord, ReviewState},
};

/// Interval assigned after the first successful review, in days.
pub const FIRST_INTERVAL_DAYS: u32 = 1;
/// Interval assigned after the second consecutive successful review, in days.
pub const SECOND_INTERVAL_DAYS: u32 = 6;
/// Interval assigned after a failed review, in days.
pub const RELEARN_INTERVAL_DAYS: u32 = 1;

/// What a grade of a given quality would do to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPreview {
    /// The hypothetical grade, 0 to 5
    pub quality: u8,
    /// Interval the grade would assign, capped at the configured maximum
    pub interval_days: u32,
    pub due_at: DateTime<Utc>,
    pub state: ReviewState,
    pub easiness_factor: f64,
}

/// Applies graded attempts to review records using the configured tunables.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: EngineConfig,
}

impl Scheduler {
    /// Create a scheduler. `config` is expected to have passed
    /// [`EngineConfig::validate`].
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Compute the record that results from grading `record` with `quality` at `now`.
    ///
    /// # Arguments
    ///
    /// * `record` - The current record, or a fresh [`ReviewState::New`] one
    /// * `quality` - The externally computed quality signal
    /// * `now` - When the attempt was graded; becomes `last_reviewed_at`
    ///
    /// # Returns
    ///
    /// The updated record with its `version` bumped by one. The input is left
    /// untouched. Fails when `now + interval_days` is past the last
    /// representable instant.
    ///
    /// # Algorithm
    ///
    /// * Failure (`q < 3`): repetitions reset to 0, interval 1 day, one more
    ///   lapse, state `learning`
    /// * Success (`q >= 3`): one more repetition; interval 1 day for the first,
    ///   6 days for the second, then the previous interval times the easiness
    ///   factor, rounded and capped at the maximum interval; state `mastered` once repetitions reach the mastery
    ///   threshold, `review` before that
    /// * Both: `EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))`, floored
    ///   at the minimum easiness. A failure never raises EF.
    /// * `due_at = now + interval_days`
    pub fn apply(
        &self,
        record: &ReviewRecord,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord, DueDateOverflowError> {
        let easiness_factor =
            next_easiness(record.easiness_factor, quality, self.config.min_easiness);

        let (repetition_count, interval_days, lapse_count, state) = if quality.is_success() {
            let repetitions = record.repetition_count.saturating_add(1);
            let interval = next_interval(
                repetitions,
                record.interval_days,
                record.easiness_factor,
                self.config.max_interval_days,
            );
            let state = if repetitions < self.config.mastery_threshold {
                ReviewState::Review
            } else {
                ReviewState::Mastered
            };
            (repetitions, interval, record.lapse_count, state)
        } else {
            (
                0,
                RELEARN_INTERVAL_DAYS,
                record.lapse_count.saturating_add(1),
                ReviewState::Learning,
            )
        };

        Ok(ReviewRecord {
            learner_id: record.learner_id,
            item_id: record.item_id.clone(),
            topic: record.topic.clone(),
            repetition_count,
            easiness_factor,
            interval_days,
            due_at: due_after(now, interval_days)?,
            last_reviewed_at: Some(now),
            lapse_count,
            state,
            version: record.version + 1,
        })
    }

    /// Preview the outcome of every possible quality for `record` at `now`.
    pub fn preview(
        &self,
        record: &ReviewRecord,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewPreview>, DueDateOverflowError> {
        (0..=i64::from(Quality::MAX))
            .filter_map(|q| Quality::try_from(q).ok())
            .map(|quality| {
                let next = self.apply(record, quality, now)?;
                Ok(ReviewPreview {
                    quality: quality.value(),
                    interval_days: next.interval_days,
                    due_at: next.due_at,
                    state: next.state,
                    easiness_factor: next.easiness_factor,
                })
            })
            .collect()
    }
}

/// Updated easiness factor for a grade of `quality`.
///
/// Standard SM-2 adjustment, clamped to `min_easiness`. For failing grades the
/// result is additionally capped at the current value.
pub fn next_easiness(easiness_factor: f64, quality: Quality, min_easiness: f64) -> f64 {
    let distance = f64::from(Quality::MAX - quality.value());
    let adjusted = easiness_factor + (0.1 - distance * (0.08 + distance * 0.02));

    let adjusted = if quality.is_success() {
        adjusted
    } else {
        adjusted.min(easiness_factor)
    };

    adjusted.max(min_easiness)
}

/// Interval in days after a successful review that brought the streak to
/// `repetitions`, never above `max_interval_days`.
pub fn next_interval(
    repetitions: u32,
    previous_interval_days: u32,
    easiness_factor: f64,
    max_interval_days: u32,
) -> u32 {
    let interval = match repetitions {
        0 | 1 => FIRST_INTERVAL_DAYS,
        2 => SECOND_INTERVAL_DAYS,
        _ => {
            let scaled = (f64::from(previous_interval_days) * easiness_factor).round();
            // Saturating float-to-int cast
            (scaled as u32).max(FIRST_INTERVAL_DAYS)
        }
    };
    interval.min(max_interval_days)
}

fn due_after(
    reviewed_at: DateTime<Utc>,
    interval_days: u32,
) -> Result<DateTime<Utc>, DueDateOverflowError> {
    reviewed_at
        .checked_add_signed(Duration::days(i64::from(interval_days)))
        .ok_or(DueDateOverflowError {
            reviewed_at,
            interval_days,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_MAX_INTERVAL_DAYS, MIN_EASINESS};
    use crate::record::{ItemId, LearnerId, Mood, Tense, TopicKey};
    use chrono::TimeZone;
    use uuid::Uuid;

    const MAX: u32 = DEFAULT_MAX_INTERVAL_DAYS;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn q(value: i64) -> Quality {
        Quality::try_from(value).unwrap()
    }

    fn fresh() -> ReviewRecord {
        ReviewRecord::new(
            LearnerId(Uuid::nil()),
            ItemId::from("hablar:present:indicative:yo"),
            TopicKey::new("hablar", Tense::Present, Mood::Indicative),
            now(),
            &EngineConfig::default(),
        )
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(EngineConfig::default())
    }

    #[test]
    fn test_fresh_item_perfect_recall() {
        let next = scheduler().apply(&fresh(), q(5), now()).unwrap();

        assert_eq!(next.repetition_count, 1);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.state, ReviewState::Review);
        assert!((next.easiness_factor - 2.6).abs() < 1e-9);
        assert_eq!(next.last_reviewed_at, Some(now()));
        assert_eq!(next.due_at, now() + Duration::days(1));
        assert_eq!(next.version, 1);
    }

    #[test]
    fn test_second_success_gets_six_days() {
        let record = ReviewRecord {
            repetition_count: 1,
            interval_days: 1,
            state: ReviewState::Review,
            ..fresh()
        };

        let next = scheduler().apply(&record, q(4), now()).unwrap();

        assert_eq!(next.repetition_count, 2);
        assert_eq!(next.interval_days, 6);
        assert!((next.easiness_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_third_success_scales_by_easiness() {
        let record = ReviewRecord {
            repetition_count: 2,
            interval_days: 6,
            state: ReviewState::Review,
            ..fresh()
        };

        let next = scheduler().apply(&record, q(4), now()).unwrap();

        // 6 * 2.5 = 15
        assert_eq!(next.interval_days, 15);
        assert_eq!(next.state, ReviewState::Review);
    }

    #[test]
    fn test_mastered_after_threshold() {
        let record = ReviewRecord {
            repetition_count: 3,
            interval_days: 15,
            state: ReviewState::Review,
            ..fresh()
        };

        let next = scheduler().apply(&record, q(4), now()).unwrap();

        assert_eq!(next.repetition_count, 4);
        assert_eq!(next.state, ReviewState::Mastered);
    }

    #[test]
    fn test_lapse_on_mastered_item() {
        let record = ReviewRecord {
            repetition_count: 5,
            easiness_factor: 2.0,
            interval_days: 20,
            state: ReviewState::Mastered,
            lapse_count: 2,
            ..fresh()
        };

        let next = scheduler().apply(&record, q(1), now()).unwrap();

        assert_eq!(next.repetition_count, 0);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.lapse_count, 3);
        assert_eq!(next.state, ReviewState::Learning);
        // 2.0 + (0.1 - 4 * (0.08 + 4 * 0.02)) = 1.46
        assert!((next.easiness_factor - 1.46).abs() < 1e-9);
    }

    #[test]
    fn test_easiness_floor() {
        let record = ReviewRecord {
            easiness_factor: 1.4,
            ..fresh()
        };

        let next = scheduler().apply(&record, q(0), now()).unwrap();
        assert_eq!(next.easiness_factor, MIN_EASINESS);

        let mut record = fresh();
        for _ in 0..10 {
            record = scheduler().apply(&record, q(0), now()).unwrap();
            assert!(record.easiness_factor >= MIN_EASINESS);
        }
        assert_eq!(record.easiness_factor, MIN_EASINESS);
    }

    #[test]
    fn test_failure_never_improves_easiness() {
        for quality in 0..3 {
            for ef in [1.3, 1.5, 2.5, 3.7] {
                assert!(next_easiness(ef, q(quality), 1.3) <= ef);
            }
        }
    }

    #[test]
    fn test_easiness_always_at_least_floor() {
        for quality in 0..=5 {
            for ef in [1.3, 1.31, 1.8, 2.5, 5.0] {
                assert!(next_easiness(ef, q(quality), 1.3) >= 1.3);
            }
        }
    }

    #[test]
    fn test_intervals_non_decreasing_under_success() {
        for quality in 3..=5 {
            let mut record = fresh();
            let mut previous = record.interval_days;
            for _ in 0..12 {
                record = scheduler().apply(&record, q(quality), now()).unwrap();
                assert!(
                    record.interval_days >= previous,
                    "interval dropped from {previous} to {} at q={quality}",
                    record.interval_days
                );
                previous = record.interval_days;
            }
        }
    }

    #[test]
    fn test_failure_resets_regardless_of_state() {
        let states = [
            ReviewState::New,
            ReviewState::Learning,
            ReviewState::Review,
            ReviewState::Mastered,
        ];
        for state in states {
            for quality in 0..3 {
                let record = ReviewRecord {
                    repetition_count: 7,
                    interval_days: 40,
                    state,
                    ..fresh()
                };
                let next = scheduler().apply(&record, q(quality), now()).unwrap();
                assert_eq!(next.repetition_count, 0);
                assert_eq!(next.interval_days, 1);
                assert_eq!(next.lapse_count, record.lapse_count + 1);
            }
        }
    }

    #[test]
    fn test_apply_is_deterministic() {
        let record = ReviewRecord {
            repetition_count: 2,
            interval_days: 6,
            easiness_factor: 2.36,
            ..fresh()
        };
        let later = now() + Duration::hours(5);

        let a = scheduler().apply(&record, q(3), now()).unwrap();
        let b = scheduler().apply(&record, q(3), later).unwrap();

        assert_eq!(a.repetition_count, b.repetition_count);
        assert_eq!(a.interval_days, b.interval_days);
        assert_eq!(a.easiness_factor, b.easiness_factor);
        assert_eq!(a.state, b.state);
        assert_eq!(a.lapse_count, b.lapse_count);
        assert_eq!(scheduler().apply(&record, q(3), now()).unwrap(), a);
    }

    #[test]
    fn test_due_at_follows_interval() {
        let record = ReviewRecord {
            repetition_count: 4,
            interval_days: 30,
            ..fresh()
        };
        let next = scheduler().apply(&record, q(5), now()).unwrap();

        let reviewed = next.last_reviewed_at.unwrap();
        assert_eq!(
            next.due_at,
            reviewed + Duration::days(i64::from(next.interval_days))
        );
    }

    #[test]
    fn test_custom_mastery_threshold() {
        let scheduler = Scheduler::new(EngineConfig {
            mastery_threshold: 2,
            ..EngineConfig::default()
        });

        let once = scheduler.apply(&fresh(), q(4), now()).unwrap();
        assert_eq!(once.state, ReviewState::Review);
        let twice = scheduler.apply(&once, q(4), now()).unwrap();
        assert_eq!(twice.state, ReviewState::Mastered);
    }

    #[test]
    fn test_preview_covers_every_quality() {
        let preview = scheduler().preview(&fresh(), now()).unwrap();

        assert_eq!(preview.len(), 6);
        assert_eq!(preview[0].state, ReviewState::Learning);
        assert_eq!(preview[5].state, ReviewState::Review);
        assert!(preview.iter().all(|p| p.interval_days == 1));
    }

    #[test]
    fn test_next_interval() {
        assert_eq!(next_interval(1, 0, 2.5, MAX), 1);
        assert_eq!(next_interval(2, 1, 2.5, MAX), 6);
        assert_eq!(next_interval(3, 6, 2.5, MAX), 15);
        assert_eq!(next_interval(3, 6, 1.3, MAX), 8);
        assert_eq!(next_interval(5, 20, 2.04, MAX), 41);
    }

    #[test]
    fn test_next_interval_is_capped() {
        assert_eq!(next_interval(20, 30_000, 2.5, MAX), MAX);
        assert_eq!(next_interval(20, u32::MAX, 4.0, MAX), MAX);
        assert_eq!(next_interval(2, 1, 2.5, 3), 3);
    }

    #[test]
    fn test_long_streak_stays_within_max_interval() {
        let mut record = fresh();
        for _ in 0..30 {
            record = scheduler().apply(&record, q(5), now()).unwrap();
            assert!(record.interval_days <= MAX);
        }
        assert_eq!(record.interval_days, MAX);
        assert_eq!(
            record.due_at,
            now() + Duration::days(i64::from(DEFAULT_MAX_INTERVAL_DAYS))
        );
    }

    #[test]
    fn test_due_date_overflow_is_an_error() {
        let err = scheduler()
            .apply(&fresh(), q(5), DateTime::<Utc>::MAX_UTC)
            .unwrap_err();
        assert_eq!(err.interval_days, 1);
        assert_eq!(err.reviewed_at, DateTime::<Utc>::MAX_UTC);

        assert!(scheduler().preview(&fresh(), DateTime::<Utc>::MAX_UTC).is_err());
    }
}
