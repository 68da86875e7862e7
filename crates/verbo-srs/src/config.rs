//! Engine tunables.
//!
//! The defaults are reasonable starting points rather than confirmed product
//! values, so every one of them can be overridden (the service reads them from
//! `SRS_`-prefixed environment variables).

use serde::Deserialize;

use crate::error::ConfigError;

/// Consecutive successes after which an item counts as mastered.
pub const DEFAULT_MASTERY_THRESHOLD: u32 = 4;
/// Easiness factor given to never-reviewed items.
pub const INITIAL_EASINESS: f64 = 2.5;
/// Hard floor of the easiness factor.
pub const MIN_EASINESS: f64 = 1.3;
/// Easiness factor that earns the full easiness share of an item's mastery score.
pub const EASINESS_CEILING: f64 = 4.0;
/// Number of most recent attempts the difficulty adviser looks at.
pub const DEFAULT_DIFFICULTY_WINDOW: usize = 20;
/// Below this many attempts in the window, no tier change is recommended.
pub const DEFAULT_MIN_ATTEMPTS: usize = 5;
/// Longest interval the scheduler assigns, in days (about a century).
pub const DEFAULT_MAX_INTERVAL_DAYS: u32 = 36_500;
/// Window accuracy at or above which a harder tier is recommended.
pub const DEFAULT_PROMOTE_ACCURACY: f64 = 0.85;
/// Window accuracy at or below which an easier tier is recommended.
pub const DEFAULT_DEMOTE_ACCURACY: f64 = 0.50;

/// Engine tunables. Missing fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Streak length that moves an item to `mastered`
    pub mastery_threshold: u32,
    /// Upper bound on `interval_days`
    pub max_interval_days: u32,
    pub initial_easiness: f64,
    pub min_easiness: f64,
    pub easiness_ceiling: f64,
    /// Default attempt window of the difficulty adviser
    pub window_size: usize,
    pub min_attempts: usize,
    pub promote_accuracy: f64,
    pub demote_accuracy: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            max_interval_days: DEFAULT_MAX_INTERVAL_DAYS,
            initial_easiness: INITIAL_EASINESS,
            min_easiness: MIN_EASINESS,
            easiness_ceiling: EASINESS_CEILING,
            window_size: DEFAULT_DIFFICULTY_WINDOW,
            min_attempts: DEFAULT_MIN_ATTEMPTS,
            promote_accuracy: DEFAULT_PROMOTE_ACCURACY,
            demote_accuracy: DEFAULT_DEMOTE_ACCURACY,
        }
    }
}

impl EngineConfig {
    /// Reject combinations that would break the record invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mastery_threshold == 0 {
            return Err(ConfigError::ZeroMasteryThreshold);
        }
        if self.max_interval_days == 0 {
            return Err(ConfigError::ZeroMaxInterval);
        }
        if !(self.min_easiness > 0.0 && self.min_easiness <= self.initial_easiness) {
            return Err(ConfigError::EasinessOrder {
                min: self.min_easiness,
                initial: self.initial_easiness,
            });
        }
        if self.easiness_ceiling <= self.min_easiness {
            return Err(ConfigError::EasinessCeiling {
                ceiling: self.easiness_ceiling,
                min: self.min_easiness,
            });
        }
        if !(0.0 <= self.demote_accuracy
            && self.demote_accuracy < self.promote_accuracy
            && self.promote_accuracy <= 1.0)
        {
            return Err(ConfigError::AccuracyThresholds {
                demote: self.demote_accuracy,
                promote: self.promote_accuracy,
            });
        }
        if self.window_size == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }
}
