//! Candidate slot scoring and epsilon-greedy recommendation.

use rand::RngExt;

use super::context::{context_modifier, perturbation};
use super::SlotEngine;
use crate::db::SlotStats;
use crate::types::{ChannelConfig, ChannelStyle, SlotKey, SlotQuery, SlotRecommendation};
use crate::util::{bin_label, bin_of_day, day_name, day_of_week, next_bin_start, BIN_MS, MS_PER_MIN};

/// Final scores never fall below this, so every candidate stays rankable.
const SCORE_FLOOR: f64 = 0.01;
/// A ten-minute median reaction saturates the reaction-time factor.
const RT_TARGET_MS: f64 = 10.0 * MS_PER_MIN as f64;
/// Deadline overruns are measured against a six-hour scale.
const OVERRUN_SCALE_MS: f64 = 6.0 * 60.0 * MS_PER_MIN as f64;
const DEADLINE_FLOOR: f64 = 0.1;

struct ScoredSlot {
    slot_start: i64,
    stats: SlotStats,
    score: f64,
    deadline_tight: bool,
}

impl SlotEngine<'_> {
    /// Rank every 30-minute bin in the next 72 hours and recommend one.
    ///
    /// Usually the top candidate; with probability epsilon, a uniform draw
    /// from the top 5 (exploration keeps cold slots from starving). Never
    /// errors: unreadable records score on the documented priors.
    pub fn optimal_slot(&mut self, query: &SlotQuery, now_ms: i64) -> SlotRecommendation {
        let tz = self.cfg.tz_offset_min;
        let first = next_bin_start(now_ms, tz);

        let mut candidates: Vec<ScoredSlot> = (0..self.cfg.horizon_bins)
            .map(|i| {
                let slot_start = first + i as i64 * BIN_MS;
                let key = SlotKey::new(
                    &query.category,
                    day_of_week(slot_start, tz),
                    bin_of_day(slot_start, tz),
                );
                let stats = self.db.slot_stats_or_default(&key);
                score_candidate(query, stats, slot_start)
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        if candidates.is_empty() {
            // Zero-bin horizon: fall back to the very next bin on priors
            let key = SlotKey::new(&query.category, day_of_week(first, tz), bin_of_day(first, tz));
            candidates.push(score_candidate(query, self.db.slot_stats_or_default(&key), first));
        }

        let pick = if self.rng.random::<f64>() < self.cfg.epsilon {
            let top = self.cfg.exploration_top_k.min(candidates.len()).max(1);
            self.rng.random_range(0..top)
        } else {
            0
        };
        let chosen = &candidates[pick.min(candidates.len().saturating_sub(1))];

        let stats = &chosen.stats;
        let median_rt = stats.median_rt_ms().max(1.0);
        let confidence = stats.confidence(self.cfg.min_samples);

        let mut reasons: Vec<String> = Vec::new();
        reasons.push(format!(
            "{} {}",
            day_name(stats.day_of_week),
            bin_label(stats.bin)
        ));
        if stats.delivered >= self.cfg.min_samples as i64 {
            reasons.push(format!(
                "{:.0}% open within 5 min",
                stats.p_open_5m() * 100.0
            ));
            reasons.push(format!("median reaction {}", fmt_duration(median_rt as i64)));
        } else {
            reasons.push("little history yet, using engagement priors".to_string());
        }
        if chosen.deadline_tight {
            reasons.push("tight against the due time".to_string());
        }
        if pick > 0 {
            reasons.push("exploring a near-best slot".to_string());
        }

        log::debug!(
            "optimal_slot: {} candidates for {}, picked {}:{} score {:.4}",
            candidates.len(),
            query.category,
            stats.day_of_week,
            stats.bin,
            chosen.score,
        );

        SlotRecommendation {
            day_of_week: stats.day_of_week,
            bin: stats.bin,
            score: chosen.score,
            confidence,
            reason: reasons.join(" · "),
            estimated_open_time: chosen.slot_start + median_rt as i64,
            channel_config: channel_config(stats),
        }
    }
}

fn score_candidate(query: &SlotQuery, stats: SlotStats, slot_start: i64) -> ScoredSlot {
    let p5 = stats.p_open_5m();
    let p30 = stats.p_open_30m();
    let median_rt = stats.median_rt_ms().max(1.0);

    let rt_factor = (RT_TARGET_MS / median_rt).min(1.0);
    let attention = 0.5 * p5 + 0.3 * p30 + 0.2 * rt_factor;

    let est_open = slot_start + median_rt as i64;
    let (deadline_factor, deadline_tight) = match query.due_at {
        Some(due) => {
            let finish = est_open.saturating_add(query.est_duration_ms.unwrap_or(0).max(0));
            let overrun = finish.saturating_sub(due);
            if overrun > 0 {
                (
                    (1.0 - overrun as f64 / OVERRUN_SCALE_MS).max(DEADLINE_FLOOR),
                    true,
                )
            } else {
                (1.0, false)
            }
        }
        None => (1.0, false),
    };

    let fatigue = if stats.delivered == 0 {
        0.3
    } else {
        (0.3 + 0.7 * stats.ignored as f64 / stats.delivered as f64).clamp(0.3, 1.0)
    };

    let priority = if query.priority01.is_finite() {
        query.priority01.clamp(0.0, 1.0)
    } else {
        0.5
    };

    let base = priority * attention * deadline_factor * (1.0 - 0.6 * fatigue);
    let modifier = context_modifier(query.context.as_ref())
        * perturbation(&stats.category, stats.day_of_week, stats.bin);
    let score = (base * modifier).max(SCORE_FLOOR);

    ScoredSlot {
        slot_start,
        stats,
        score,
        deadline_tight,
    }
}

/// Delivery-channel settings from the slot's engagement profile.
pub(super) fn channel_config(stats: &SlotStats) -> ChannelConfig {
    let p5 = stats.p_open_5m();
    let p30 = stats.p_open_30m();
    let median_rt = stats.median_rt_ms();

    if p5 < 0.15 && p30 < 0.35 {
        ChannelConfig {
            style: ChannelStyle::Quiet,
            digest: true,
            early_reminders: false,
        }
    } else if p5 > 0.5 && median_rt < 5.0 * MS_PER_MIN as f64 {
        ChannelConfig {
            style: ChannelStyle::Loud,
            digest: false,
            early_reminders: true,
        }
    } else {
        ChannelConfig {
            style: ChannelStyle::Normal,
            digest: false,
            early_reminders: false,
        }
    }
}

fn fmt_duration(ms: i64) -> String {
    let minutes = ms / MS_PER_MIN;
    if minutes < 1 {
        "under a minute".to_string()
    } else if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{:.1} h", minutes as f64 / 60.0)
    }
}
