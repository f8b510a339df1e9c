//! Engine tunables.
//!
//! One plain struct, constructor-injected into both engines. Defaults match
//! the shipped product behavior; tests override individual fields.

use serde::{Deserialize, Serialize};

use crate::util::MS_PER_DAY;

/// A daily do-not-disturb window in bins. `start_bin > end_bin` wraps past
/// midnight (e.g. 44..14 covers 22:00-07:00).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub start_bin: u8,
    pub end_bin: u8,
}

impl QuietHours {
    pub fn contains(&self, bin: u8) -> bool {
        if self.start_bin <= self.end_bin {
            bin >= self.start_bin && bin < self.end_bin
        } else {
            bin >= self.start_bin || bin < self.end_bin
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Recency half-life for slot statistics, in ms (14 days).
    pub half_life_ms: i64,
    /// Deliveries per slot before a recommendation counts as seasoned.
    pub min_samples: u32,
    /// Epsilon-greedy exploration rate.
    pub epsilon: f64,
    /// Exploration samples uniformly from this many top candidates.
    pub exploration_top_k: usize,
    /// Candidate bins scanned ahead of `now` (144 = 72 hours).
    pub horizon_bins: usize,
    /// Minutes east of UTC for wall-clock bin/day derivation.
    pub tz_offset_min: i32,
    pub quiet_hours: Option<QuietHours>,
    pub max_suggestions_per_day: usize,
    /// Trigram Jaccard threshold for merging near-duplicate titles.
    pub merge_similarity: f64,
    /// Bin distance within which a creation joins an existing cluster.
    pub cluster_merge_radius: f64,
    pub max_occurrences: usize,
    pub max_clusters: usize,
    /// EWMA bin half-life, in weeks.
    pub ewma_half_life_weeks: f64,
    /// Suggestion cooldown after a dismissal, in days.
    pub dismiss_cooldown_days: i64,
    /// Consecutive ignores that pause a pattern.
    pub ignored_pause_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_life_ms: 14 * MS_PER_DAY,
            min_samples: 5,
            epsilon: 0.10,
            exploration_top_k: 5,
            horizon_bins: 144,
            tz_offset_min: 0,
            quiet_hours: None,
            max_suggestions_per_day: 3,
            merge_similarity: 0.9,
            cluster_merge_radius: 2.0,
            max_occurrences: 32,
            max_clusters: 3,
            ewma_half_life_weeks: 6.0,
            dismiss_cooldown_days: 14,
            ignored_pause_threshold: 3,
        }
    }
}
