//! Persisted aggregate shapes and storage errors.
//!
//! These structs are the storage format: their fields map 1:1 to columns
//! (embedded rings/sets map to JSON columns), and their defaults are the
//! documented priors a missing record synthesizes to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Cadence, SlotKey, UserResponse};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Corrupt record {key}: {detail}")]
    Corrupt { key: String, detail: String },
}

// ---------------------------------------------------------------------------
// Slot statistics
// ---------------------------------------------------------------------------

/// Uninformative-ish Beta prior centered at 0.5.
pub const PRIOR_ALPHA: f64 = 2.0;
pub const PRIOR_BETA: f64 = 2.0;
/// ln(15 minutes in ms): the prior median reaction time.
pub const PRIOR_LN_RT_MEAN: f64 = 13.710150042306449;
pub const PRIOR_LN_RT_VAR: f64 = 0.64;

/// Learned engagement statistics for one slot (or the global aggregate).
///
/// Invariant: every Beta parameter stays strictly positive, so derived
/// probabilities are always inside (0,1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStats {
    /// `category:dow:bin`, or `__global__` for the all-up aggregate.
    pub slot_key: String,
    pub category: String,
    pub day_of_week: u8,
    pub bin: u8,
    pub open5m_alpha: f64,
    pub open5m_beta: f64,
    pub open30m_alpha: f64,
    pub open30m_beta: f64,
    pub ln_rt_mean: f64,
    pub ln_rt_var: f64,
    /// Cumulative recency weight — the EWMA denominator.
    pub weight: f64,
    pub delivered: i64,
    pub opened: i64,
    pub ignored: i64,
    pub last_update_at: i64,
}

impl SlotStats {
    /// Synthesize the documented default for a key with no stored record.
    pub fn fresh(slot_key: &str, category: &str, day_of_week: u8, bin: u8) -> Self {
        Self {
            slot_key: slot_key.to_string(),
            category: category.to_string(),
            day_of_week,
            bin,
            open5m_alpha: PRIOR_ALPHA,
            open5m_beta: PRIOR_BETA,
            open30m_alpha: PRIOR_ALPHA,
            open30m_beta: PRIOR_BETA,
            ln_rt_mean: PRIOR_LN_RT_MEAN,
            ln_rt_var: PRIOR_LN_RT_VAR,
            weight: 1.0,
            delivered: 0,
            opened: 0,
            ignored: 0,
            last_update_at: 0,
        }
    }

    pub fn fresh_for(key: &SlotKey) -> Self {
        Self::fresh(&key.storage_key(), &key.category, key.day_of_week, key.bin)
    }

    /// Probability of opening within 5 minutes. Malformed parameters clamp
    /// so the result stays inside (0,1).
    pub fn p_open_5m(&self) -> f64 {
        beta_mean(self.open5m_alpha, self.open5m_beta)
    }

    pub fn p_open_30m(&self) -> f64 {
        beta_mean(self.open30m_alpha, self.open30m_beta)
    }

    /// Median reaction time in ms (log-normal median = exp(mean of ln)).
    /// Clamped to [1s, 24h] so a corrupt stored mean cannot blow up
    /// downstream arithmetic.
    pub fn median_rt_ms(&self) -> f64 {
        self.ln_rt_mean.exp().clamp(1_000.0, crate::util::MS_PER_DAY as f64)
    }

    /// min(1, delivered / (3 · min_samples)).
    pub fn confidence(&self, min_samples: u32) -> f64 {
        let denom = (3 * min_samples).max(1) as f64;
        (self.delivered as f64 / denom).min(1.0)
    }
}

/// Beta posterior mean with strictly-positive parameter clamping.
pub fn beta_mean(alpha: f64, beta: f64) -> f64 {
    let a = alpha.max(1e-6);
    let b = beta.max(1e-6);
    a / (a + b)
}

// ---------------------------------------------------------------------------
// Pattern models
// ---------------------------------------------------------------------------

/// One habitual creation of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// ISO week key, e.g. `2026-W32`.
    pub year_week: String,
    pub creation_day_of_week: u8,
    pub creation_bin: u8,
    pub created_at: i64,
}

/// A preferred-time-of-day hypothesis. Weight decays with disuse; the
/// stored weight is un-decayed and readers apply the decay from
/// `last_seen_at` (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCluster {
    /// Fractional bin center.
    pub bin: f64,
    pub weight: f64,
    pub last_seen_at: i64,
}

/// Recurring-task hypothesis keyed by `normalized_title::target_dow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternModel {
    pub pattern_key: String,
    pub category: String,
    /// Most recent literal wording the user typed.
    pub display_title: String,
    pub normalized_title: String,
    pub target_dow: u8,
    /// Bounded ring, oldest first. Capacity enforced on append.
    pub occurrences: Vec<Occurrence>,
    /// Bounded set, at most 3, weight-ranked.
    pub clusters: Vec<TimeCluster>,
    pub ewma_bin: u8,
    /// Cumulative recency mass behind `ewma_bin`.
    pub ewma_weight: f64,
    pub cadence: Cadence,
    pub last_suggested_at: Option<i64>,
    pub last_user_response: Option<UserResponse>,
    /// Consecutive ignored suggestions.
    pub ignored_count: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PatternModel {
    pub fn new(
        pattern_key: &str,
        category: &str,
        display_title: &str,
        normalized_title: &str,
        target_dow: u8,
        created_at: i64,
    ) -> Self {
        Self {
            pattern_key: pattern_key.to_string(),
            category: category.to_string(),
            display_title: display_title.to_string(),
            normalized_title: normalized_title.to_string(),
            target_dow,
            occurrences: Vec::new(),
            clusters: Vec::new(),
            ewma_bin: 0,
            ewma_weight: 0.0,
            cadence: Cadence::Irregular,
            last_suggested_at: None,
            last_user_response: None,
            ignored_count: 0,
            created_at,
            updated_at: created_at,
        }
    }

    /// Append an occurrence, evicting the oldest beyond `cap`.
    pub fn push_occurrence(&mut self, occ: Occurrence, cap: usize) {
        self.occurrences.push(occ);
        while self.occurrences.len() > cap {
            self.occurrences.remove(0);
        }
    }

    /// True iff some occurrence was created in the given ISO week.
    pub fn has_occurrence_in_week(&self, year_week: &str) -> bool {
        self.occurrences.iter().any(|o| o.year_week == year_week)
    }
}
