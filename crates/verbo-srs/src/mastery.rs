//! Topic mastery derived from review records.
//!
//! Nothing computed here is stored as a source of truth: every snapshot can be
//! rebuilt from the records it was computed from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::EngineConfig,
    record::{ReviewRecord, ReviewState, TopicKey},
};

/// Share of an item's score earned by its repetition streak.
const REPETITION_WEIGHT: f64 = 60.0;
/// Share of an item's score earned by its easiness factor.
const EASINESS_WEIGHT: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMastery {
    pub topic_key: TopicKey,
    /// 0 to 100
    pub mastery_score: f64,
    pub sample_size: usize,
    pub last_computed_at: DateTime<Utc>,
}

/// Mastery of one topic. A topic nobody has attempted has no score at all,
/// which is different from a score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Mastery {
    Scored(TopicMastery),
    InsufficientData { topic_key: TopicKey },
}

impl Mastery {
    pub const fn score(&self) -> Option<f64> {
        match self {
            Self::Scored(snapshot) => Some(snapshot.mastery_score),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Score of a single record, 0 to 100.
pub fn item_score(record: &ReviewRecord, config: &EngineConfig) -> f64 {
    let threshold = f64::from(config.mastery_threshold.max(1));
    let repetitions = f64::from(record.repetition_count) / threshold * REPETITION_WEIGHT;
    let easiness = (record.easiness_factor - config.min_easiness)
        / (config.easiness_ceiling - config.min_easiness)
        * EASINESS_WEIGHT;

    (repetitions + easiness).min(100.0).clamp(0.0, 100.0)
}

/// Mastery of `topic` from the learner's records. Records of other topics are ignored.
pub fn aggregate(
    topic: &TopicKey,
    records: &[ReviewRecord],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Mastery {
    let scores: Vec<f64> = records
        .iter()
        .filter(|record| &record.topic == topic)
        .map(|record| item_score(record, config))
        .collect();

    if scores.is_empty() {
        return Mastery::InsufficientData {
            topic_key: topic.clone(),
        };
    }

    Mastery::Scored(TopicMastery {
        topic_key: topic.clone(),
        mastery_score: scores.iter().sum::<f64>() / scores.len() as f64,
        sample_size: scores.len(),
        last_computed_at: now,
    })
}

/// One snapshot per topic present in `records`, ordered by topic key.
pub fn overview(
    records: &[ReviewRecord],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<TopicMastery> {
    let mut by_topic: BTreeMap<&TopicKey, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_topic.entry(&record.topic).or_default();
        entry.0 += item_score(record, config);
        entry.1 += 1;
    }

    by_topic
        .into_iter()
        .map(|(topic, (total, count))| TopicMastery {
            topic_key: topic.clone(),
            mastery_score: total / count as f64,
            sample_size: count,
            last_computed_at: now,
        })
        .collect()
}

/// Record counts per state for one learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub mastered: usize,
    /// Records with `due_at <= now`
    pub due_now: usize,
    /// Sum of every record's lapse count
    pub lapses: u64,
}

impl ReviewSummary {
    /// Tally `records` as of `now`.
    pub fn from_records(records: &[ReviewRecord], now: DateTime<Utc>) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.state {
                ReviewState::New => summary.new += 1,
                ReviewState::Learning => summary.learning += 1,
                ReviewState::Review => summary.review += 1,
                ReviewState::Mastered => summary.mastered += 1,
            }
            if record.is_due(now) {
                summary.due_now += 1;
            }
            summary.lapses += u64::from(record.lapse_count);
            summary
        })
    }
}
