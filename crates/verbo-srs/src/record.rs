//! Review records and the identifiers they are keyed by.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::EngineConfig, error::InvalidQualityError};

/// Opaque learner identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub Uuid);

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for LearnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Opaque practice item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap a caller-chosen id, e.g. `hablar:preterite:1s`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A keyword (tense, mood, state or tier name) that is not one of the known values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseKeywordError {
    kind: &'static str,
    value: String,
}

impl ParseKeywordError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Generates `ALL`, `as_str`, `Display` and `FromStr` for a unit-only enum with snake_case names.
macro_rules! keyword_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The snake_case name used on the wire and in storage.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::record::ParseKeywordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::record::ParseKeywordError::new($kind, other)),
                }
            }
        }
    };
}

pub(crate) use keyword_enum;

/// Spanish verb tenses. Compound tenses are formed with *haber*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tense {
    /// *hablo*
    Present,
    /// *hablé*
    Preterite,
    /// *hablaba*
    Imperfect,
    /// *hablaré*
    Future,
    /// *hablaría*
    Conditional,
    /// *he hablado*
    PresentPerfect,
    /// *había hablado*
    PastPerfect,
    /// *habré hablado*
    FuturePerfect,
    /// *habría hablado*
    ConditionalPerfect,
}

keyword_enum!(Tense, "tense", {
    Present => "present",
    Preterite => "preterite",
    Imperfect => "imperfect",
    Future => "future",
    Conditional => "conditional",
    PresentPerfect => "present_perfect",
    PastPerfect => "past_perfect",
    FuturePerfect => "future_perfect",
    ConditionalPerfect => "conditional_perfect",
});

/// Grammatical mood of a conjugation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Statements of fact
    Indicative,
    /// Wishes, doubt and hypotheticals
    Subjunctive,
    /// Commands
    Imperative,
}

keyword_enum!(Mood, "mood", {
    Indicative => "indicative",
    Subjunctive => "subjunctive",
    Imperative => "imperative",
});

/// The topic a practice item belongs to: one verb in one tense and mood.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    /// Infinitive, e.g. `hablar`
    pub verb: String,
    pub tense: Tense,
    pub mood: Mood,
}

impl TopicKey {
    /// Build a topic key from its three parts.
    pub fn new(verb: impl Into<String>, tense: Tense, mood: Mood) -> Self {
        Self {
            verb: verb.into(),
            tense,
            mood,
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.verb, self.tense, self.mood)
    }
}

/// Partial topic match used when listing records. Unset parts match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFilter {
    /// Exact infinitive to match
    pub verb: Option<String>,
    pub tense: Option<Tense>,
    pub mood: Option<Mood>,
}

impl TopicFilter {
    /// A filter that matches every topic.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter that matches exactly one topic.
    pub fn exact(topic: &TopicKey) -> Self {
        Self {
            verb: Some(topic.verb.clone()),
            tense: Some(topic.tense),
            mood: Some(topic.mood),
        }
    }

    /// Whether every set part equals the corresponding part of `topic`.
    pub fn matches(&self, topic: &TopicKey) -> bool {
        self.verb.as_deref().is_none_or(|verb| verb == topic.verb)
            && self.tense.is_none_or(|tense| tense == topic.tense)
            && self.mood.is_none_or(|mood| mood == topic.mood)
    }
}

/// Lifecycle of a review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Never graded
    New,
    /// Last graded as a failure, being relearned
    Learning,
    /// Recalled successfully, streak below the mastery threshold
    Review,
    /// Streak at or above the mastery threshold
    Mastered,
}

keyword_enum!(ReviewState, "review state", {
    New => "new",
    Learning => "learning",
    Review => "review",
    Mastered => "mastered",
});

/// Graded quality of one attempt, `0` (blackout) to `5` (perfect recall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Perfect recall.
    pub const MAX: u8 = 5;
    /// Lowest quality that counts as a successful recall.
    pub const PASSING: u8 = 3;

    /// The numeric grade.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Grades of [`Quality::PASSING`] and above.
    pub const fn is_success(self) -> bool {
        self.0 >= Self::PASSING
    }
}

impl TryFrom<i64> for Quality {
    type Error = InvalidQualityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(q) if q <= Self::MAX => Ok(Self(q)),
            _ => Err(InvalidQualityError(value)),
        }
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Scheduling state of one practice item for one learner.
///
/// Only the [`Scheduler`](crate::scheduler::Scheduler) produces updated
/// records; `due_at` is always derived from `last_reviewed_at` and
/// `interval_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    /// Topic the item counts towards for mastery
    pub topic: TopicKey,
    /// Consecutive successful reviews since the last failure
    pub repetition_count: u32,
    /// SM-2 easiness factor, never below the configured minimum
    pub easiness_factor: f64,
    /// Days between `last_reviewed_at` and `due_at`, 0 for new items
    pub interval_days: u32,
    /// When the item is next eligible for review
    pub due_at: DateTime<Utc>,
    /// `None` until the first grade
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Failed grades over the record's lifetime
    pub lapse_count: u32,
    pub state: ReviewState,
    /// Optimistic concurrency stamp, 0 until first persisted
    pub version: u64,
}

impl ReviewRecord {
    /// Fresh record for an item the learner has never attempted.
    pub fn new(
        learner_id: LearnerId,
        item_id: ItemId,
        topic: TopicKey,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            learner_id,
            item_id,
            topic,
            repetition_count: 0,
            easiness_factor: config.initial_easiness,
            interval_days: 0,
            due_at: now,
            last_reviewed_at: None,
            lapse_count: 0,
            state: ReviewState::New,
            version: 0,
        }
    }

    /// Whether the item may be reviewed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}
