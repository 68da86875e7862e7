//! Difficulty tier recommendations from rolling accuracy.

use serde::{Deserialize, Serialize};

use crate::{config::EngineConfig, record::keyword_enum};

/// Practice difficulty, easiest first. Ordering follows difficulty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyTier {
    /// The next tier up, saturating at [`DifficultyTier::Expert`].
    pub const fn harder(self) -> Self {
        match self {
            Self::Beginner => Self::Intermediate,
            Self::Intermediate => Self::Advanced,
            Self::Advanced | Self::Expert => Self::Expert,
        }
    }

    /// The next tier down, saturating at [`DifficultyTier::Beginner`].
    pub const fn easier(self) -> Self {
        match self {
            Self::Beginner | Self::Intermediate => Self::Beginner,
            Self::Advanced => Self::Intermediate,
            Self::Expert => Self::Advanced,
        }
    }
}

keyword_enum!(DifficultyTier, "difficulty tier", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Expert => "expert",
});

/// Which branch of the policy produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Accuracy at or above the promote threshold (the tier may already be the hardest).
    Promote,
    /// Accuracy at or below the demote threshold (the tier may already be the easiest).
    Demote,
    Hold,
    /// Too few attempts in the window to judge.
    InsufficientData,
}

/// A tier recommendation and the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAdvice {
    /// The learner's stored tier, `beginner` if none was set
    pub current: DifficultyTier,
    /// Equal to `current` unless the adjustment moved it
    pub recommended: DifficultyTier,
    pub adjustment: Adjustment,
    /// `None` when the window holds no attempts
    pub accuracy: Option<f64>,
    /// Attempts actually in the window, at most the window size
    pub sample_size: usize,
}

/// Recommend a tier from the outcomes of the most recent attempts.
///
/// `outcomes` is newest first; only the first `window` entries are used.
pub fn advise(
    current: DifficultyTier,
    outcomes: &[bool],
    window: usize,
    config: &EngineConfig,
) -> DifficultyAdvice {
    let sample = &outcomes[..outcomes.len().min(window)];
    let sample_size = sample.len();
    let successes = sample.iter().filter(|success| **success).count();
    let accuracy = (sample_size > 0).then(|| successes as f64 / sample_size as f64);

    let (adjustment, recommended) = match accuracy {
        _ if sample_size < config.min_attempts => (Adjustment::InsufficientData, current),
        Some(accuracy) if accuracy >= config.promote_accuracy => {
            (Adjustment::Promote, current.harder())
        }
        Some(accuracy) if accuracy <= config.demote_accuracy => {
            (Adjustment::Demote, current.easier())
        }
        Some(_) => (Adjustment::Hold, current),
        None => (Adjustment::InsufficientData, current),
    };

    DifficultyAdvice {
        current,
        recommended,
        adjustment,
        accuracy,
        sample_size,
    }
}
