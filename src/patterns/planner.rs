//! Watch decisions and proactive suggestion planning.

use std::collections::HashMap;

use uuid::Uuid;

use super::detector::cluster_weight;
use super::PatternEngine;
use crate::db::PatternModel;
use crate::error::EngineError;
use crate::slots::decay::recency_weight;
use crate::types::{Cadence, LearnedSlot, SuggestionAction, SuggestionNotification, UserResponse};
use crate::util::{
    bin_label, day_name, day_of_week, day_start, year_week, BIN_MS, MS_PER_DAY,
};

/// Cluster-confidence decay half-life: three weeks of disuse halves-ish the
/// certainty a cluster carries.
const CLUSTER_CONFIDENCE_HALF_LIFE_MS: i64 = 21 * MS_PER_DAY;
/// Dominant-day votes decay with a 14-day half-life.
const VOTE_HALF_LIFE_MS: i64 = 14 * MS_PER_DAY;
/// Votes consider at most this many recent occurrences.
const VOTE_WINDOW: usize = 8;

impl PatternEngine<'_> {
    /// The habitual creation slot for a pattern, or `None` below three
    /// occurrences.
    ///
    /// Day: recency-weighted vote over recent occurrences. Bin: from the
    /// cluster set — a lone cluster is trusted as far as its decayed weight
    /// goes; two adjacent clusters average; two separated clusters mean the
    /// habit shifted and only the strongest is used.
    pub fn learned_creation_slot(&self, model: &PatternModel, now_ms: i64) -> Option<LearnedSlot> {
        if model.occurrences.len() < 3 {
            return None;
        }

        let recent = &model.occurrences[model.occurrences.len().saturating_sub(VOTE_WINDOW)..];
        let mut votes = [0.0f64; 7];
        for occ in recent {
            let age = (now_ms - occ.created_at).max(0);
            votes[(occ.creation_day_of_week % 7) as usize] +=
                recency_weight(age, VOTE_HALF_LIFE_MS);
        }
        let day_of_week = votes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(d, _)| d as u8)
            .unwrap_or(model.target_dow);

        let mut ranked: Vec<(f64, f64)> = model
            .clusters
            .iter()
            .map(|c| {
                let staleness = (now_ms - c.last_seen_at).max(0);
                (
                    c.bin,
                    cluster_weight(c, now_ms)
                        * recency_weight(staleness, CLUSTER_CONFIDENCE_HALF_LIFE_MS),
                )
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (bin, confidence) = match ranked.as_slice() {
            [] => (model.ewma_bin as f64, 0.3),
            [(bin, w)] => (*bin, (w / (w + 2.0)).min(0.9)),
            [(b1, w1), (b2, w2), ..] => {
                if (b1 - b2).abs() <= self.cfg.cluster_merge_radius {
                    let merged = (b1 * w1 + b2 * w2) / (w1 + w2).max(1e-9);
                    let w = w1 + w2;
                    (merged, (w / (w + 2.0)).min(0.95))
                } else {
                    // Shifted habit: trust only the dominant cluster
                    (*b1, (w1 / (w1 + 2.0)).min(0.9))
                }
            }
        };

        Some(LearnedSlot {
            day_of_week,
            bin: (bin.round() as i64).clamp(0, 47) as u8,
            confidence,
        })
    }

    /// Whether a pattern currently earns proactive suggestions.
    pub fn should_watch(&self, model: &PatternModel, now_ms: i64) -> bool {
        if model.cadence == Cadence::Irregular {
            return false;
        }
        if model.occurrences.len() < 3 {
            return false;
        }
        if model.ignored_count >= self.cfg.ignored_pause_threshold {
            return false;
        }
        if model.last_user_response == Some(UserResponse::Dismissed) {
            if let Some(dismissed_at) = model.last_suggested_at {
                let cooldown = self.cfg.dismiss_cooldown_days * MS_PER_DAY;
                if now_ms < dismissed_at + cooldown {
                    return false;
                }
            }
        }
        true
    }

    /// Plan suggestion notifications for the next `days_ahead` days.
    ///
    /// Read-only: nothing is marked suggested here, so re-planning is
    /// idempotent. Patterns whose task already exists this ISO week are
    /// skipped; fire times inside quiet hours shift to the window's end, or
    /// drop entirely when the shift would cross midnight.
    pub fn plan_suggestions(
        &self,
        days_ahead: u32,
        now_ms: i64,
    ) -> Result<Vec<SuggestionNotification>, EngineError> {
        let tz = self.cfg.tz_offset_min;
        let today = day_start(now_ms, tz);

        let mut planned: Vec<SuggestionNotification> = Vec::new();
        for model in self.db.all_patterns()? {
            if !self.should_watch(&model, now_ms) {
                continue;
            }

            let learned = self.learned_creation_slot(&model, now_ms);
            let bin = learned.as_ref().map(|s| s.bin).unwrap_or(model.ewma_bin);

            let Some(fire_at) = self.next_fire_time(&model, bin, today, days_ahead, now_ms)
            else {
                continue;
            };

            if model.has_occurrence_in_week(&year_week(fire_at, tz)) {
                log::debug!(
                    "plan: {} already created this cycle, skipping",
                    model.pattern_key
                );
                continue;
            }

            let mut actions = vec![
                SuggestionAction::Add,
                SuggestionAction::AddToday,
                SuggestionAction::Skip,
            ];
            if matches!(model.cadence, Cadence::Biweekly | Cadence::Monthly) {
                actions.push(SuggestionAction::SetRepeat);
            }

            let fire_bin = crate::util::bin_of_day(fire_at, tz);
            planned.push(SuggestionNotification {
                id: format!("sn-{}", Uuid::new_v4()),
                pattern_key: model.pattern_key.clone(),
                title: format!("Add \"{}\"?", model.display_title),
                display_title: model.display_title.clone(),
                target_dow: model.target_dow,
                target_label: day_name(model.target_dow).to_string(),
                rationale: format!(
                    "You usually add this on {}s around {} ({})",
                    day_name(model.target_dow),
                    bin_label(fire_bin),
                    model.cadence.as_str(),
                ),
                fire_at,
                actions,
            });
        }

        // Per-day cap, earliest fire times win
        planned.sort_by_key(|s| s.fire_at);
        let mut per_day: HashMap<i64, usize> = HashMap::new();
        planned.retain(|s| {
            let count = per_day.entry(s.fire_day(tz)).or_insert(0);
            if *count < self.cfg.max_suggestions_per_day {
                *count += 1;
                true
            } else {
                false
            }
        });

        log::info!("plan: {} suggestions over the next {} days", planned.len(), days_ahead);
        Ok(planned)
    }

    /// First future fire time matching the pattern's target day, with quiet
    /// hours applied. `None` drops the occurrence.
    fn next_fire_time(
        &self,
        model: &PatternModel,
        bin: u8,
        today_start: i64,
        days_ahead: u32,
        now_ms: i64,
    ) -> Option<i64> {
        let tz = self.cfg.tz_offset_min;
        for d in 0..=days_ahead as i64 {
            let date_start = today_start + d * MS_PER_DAY;
            if day_of_week(date_start, tz) != model.target_dow {
                continue;
            }

            let mut fire_bin = bin;
            if let Some(quiet) = self.cfg.quiet_hours {
                if quiet.contains(bin) {
                    // A wrapping window whose tail we're in ends tomorrow:
                    // shifting would cross midnight, so drop the occurrence
                    if quiet.start_bin > quiet.end_bin && bin >= quiet.start_bin {
                        log::debug!(
                            "plan: {} fire bin {} shifts past midnight, dropped",
                            model.pattern_key,
                            bin
                        );
                        return None;
                    }
                    fire_bin = quiet.end_bin;
                }
            }

            let fire_at = date_start + fire_bin as i64 * BIN_MS;
            if fire_at <= now_ms {
                continue;
            }
            return Some(fire_at);
        }
        None
    }

    /// Record the user's answer to a suggestion.
    pub fn handle_response(
        &self,
        pattern_key: &str,
        response: UserResponse,
        now_ms: i64,
    ) -> Result<(), EngineError> {
        let mut model = self
            .db
            .get_pattern(pattern_key)?
            .ok_or_else(|| EngineError::PatternNotFound(pattern_key.to_string()))?;

        match response {
            UserResponse::Accepted => model.ignored_count = 0,
            UserResponse::Ignored => {
                model.ignored_count += 1;
                if model.ignored_count >= self.cfg.ignored_pause_threshold {
                    log::info!(
                        "patterns: {} paused after {} consecutive ignores",
                        pattern_key,
                        model.ignored_count
                    );
                }
            }
            UserResponse::Dismissed => {
                // Cooldown window anchors at the dismissal
                model.last_suggested_at = Some(now_ms);
            }
        }
        model.last_user_response = Some(response);
        model.updated_at = now_ms;

        self.db
            .with_transaction(|db| db.upsert_pattern(&model).map_err(EngineError::from))
    }

    /// True iff the pattern already has an occurrence in the given ISO week.
    pub fn task_exists_for_pattern(
        &self,
        pattern_key: &str,
        year_week: &str,
    ) -> Result<bool, EngineError> {
        let model = self
            .db
            .get_pattern(pattern_key)?
            .ok_or_else(|| EngineError::PatternNotFound(pattern_key.to_string()))?;
        Ok(model.has_occurrence_in_week(year_week))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, QuietHours};
    use crate::db::test_utils::test_db;
    use crate::types::TaskCreation;
    use crate::util::{bin_of_day, MS_PER_WEEK};

    // Monday 2026-08-03 09:30 UTC — dow 1, bin 19.
    const MONDAY_0930: i64 = 1_785_749_400_000;

    fn creation(title: &str, created_at: i64) -> TaskCreation {
        TaskCreation {
            title: title.to_string(),
            category: "Groceries".to_string(),
            due_at: None,
            created_at,
        }
    }

    /// Four consecutive Mondays near 09:30, ending at MONDAY_0930.
    fn seed_weekly_milk(engine: &PatternEngine) -> i64 {
        for i in 0..4 {
            let at = MONDAY_0930 - (3 - i) * MS_PER_WEEK;
            engine.log_task_creation(&creation("buy milk", at)).unwrap();
        }
        MONDAY_0930
    }

    #[test]
    fn test_learned_slot_after_four_mondays() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let now = seed_weekly_milk(&engine);

        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert_eq!(model.cadence, Cadence::Weekly);

        let slot = engine.learned_creation_slot(&model, now).expect("slot");
        assert_eq!(slot.day_of_week, 1);
        assert!((18..=20).contains(&slot.bin), "bin near 19, got {}", slot.bin);
        assert!(slot.confidence > 0.5, "confidence {}", slot.confidence);
        assert!(slot.confidence <= 0.9);
    }

    #[test]
    fn test_learned_slot_requires_three_occurrences() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        engine.log_task_creation(&creation("buy milk", MONDAY_0930)).unwrap();
        engine
            .log_task_creation(&creation("buy milk", MONDAY_0930 + MS_PER_WEEK))
            .unwrap();

        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert!(engine.learned_creation_slot(&model, MONDAY_0930 + MS_PER_WEEK).is_none());
    }

    #[test]
    fn test_learned_slot_shifted_habit_uses_dominant_cluster() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        // Two old morning creations, then three recent evening ones
        for i in 0..2 {
            engine
                .log_task_creation(&creation("buy milk", MONDAY_0930 + i * MS_PER_WEEK))
                .unwrap();
        }
        let evening_base = MONDAY_0930 + 2 * MS_PER_WEEK + 20 * crate::util::BIN_MS; // bin 39
        for i in 0..3 {
            engine
                .log_task_creation(&creation("buy milk", evening_base + i * MS_PER_WEEK))
                .unwrap();
        }
        let now = evening_base + 2 * MS_PER_WEEK;

        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        let slot = engine.learned_creation_slot(&model, now).expect("slot");
        assert!((38..=40).contains(&slot.bin), "evening cluster wins, got {}", slot.bin);
    }

    #[test]
    fn test_should_watch_gates() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let now = seed_weekly_milk(&engine);
        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert!(engine.should_watch(&model, now));

        // Irregular cadence is never watched
        let mut irregular = model.clone();
        irregular.cadence = Cadence::Irregular;
        assert!(!engine.should_watch(&irregular, now));

        // Three consecutive ignores pause it
        let mut paused = model.clone();
        paused.ignored_count = 3;
        assert!(!engine.should_watch(&paused, now));

        // A fresh dismissal starts a two-week cooldown
        let mut dismissed = model.clone();
        dismissed.last_user_response = Some(UserResponse::Dismissed);
        dismissed.last_suggested_at = Some(now);
        assert!(!engine.should_watch(&dismissed, now + MS_PER_DAY));
        assert!(engine.should_watch(&dismissed, now + 15 * MS_PER_DAY));
    }

    #[test]
    fn test_plan_suggests_next_monday() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let now = seed_weekly_milk(&engine);

        // Planning from Tuesday: the created-this-week occurrence is behind us
        let tuesday = now + MS_PER_DAY;
        let plans = engine.plan_suggestions(7, tuesday).expect("plan");
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.target_dow, 1);
        assert_eq!(plan.target_label, "Monday");
        assert_eq!(bin_of_day(plan.fire_at, 0), 19);
        assert_eq!(day_of_week(plan.fire_at, 0), 1);
        assert!(plan.fire_at > tuesday);
        assert!(plan.rationale.contains("Mondays"));
        assert!(plan.rationale.contains("weekly"));
        assert!(plan.actions.contains(&SuggestionAction::Add));
        assert!(plan.actions.contains(&SuggestionAction::Skip));
        assert!(!plan.actions.contains(&SuggestionAction::SetRepeat), "weekly gets no set_repeat");
        assert!(plan.id.starts_with("sn-"));
    }

    #[test]
    fn test_plan_skips_week_with_existing_task() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let now = seed_weekly_milk(&engine);

        // Planning early the same Monday: the candidate fire time (09:30)
        // lands in an ISO week that already has an occurrence
        let early_monday = now - 2 * 60 * 60 * 1000;
        let plans = engine.plan_suggestions(3, early_monday).expect("plan");
        assert!(plans.is_empty(), "created-this-week pattern must not re-suggest");
    }

    #[test]
    fn test_plan_respects_daily_cap() {
        let db = test_db();
        let cfg = EngineConfig {
            max_suggestions_per_day: 2,
            ..Default::default()
        };
        let engine = PatternEngine::new(&db, cfg);
        // Five weekly Monday patterns at different times
        for (title, bins) in [("buy milk", 18), ("water plants", 20), ("meal prep", 22),
                              ("clean fridge", 24), ("plan week", 26)] {
            for i in 0..4 {
                let at = crate::util::day_start(MONDAY_0930, 0) - (3 - i) * MS_PER_WEEK
                    + bins * crate::util::BIN_MS;
                engine.log_task_creation(&creation(title, at)).unwrap();
            }
        }

        let tuesday = MONDAY_0930 + MS_PER_DAY;
        let plans = engine.plan_suggestions(7, tuesday).expect("plan");
        assert_eq!(plans.len(), 2, "per-day cap applies");
        // Ties break toward the earliest fire times
        assert!(plans[0].fire_at <= plans[1].fire_at);
        assert_eq!(bin_of_day(plans[0].fire_at, 0), 18);
        assert_eq!(bin_of_day(plans[1].fire_at, 0), 20);
    }

    #[test]
    fn test_quiet_hours_shift_fire_time() {
        let db = test_db();
        let cfg = EngineConfig {
            // 06:00–10:00 quiet: bin 19 shifts to bin 20
            quiet_hours: Some(QuietHours { start_bin: 12, end_bin: 20 }),
            ..Default::default()
        };
        let engine = PatternEngine::new(&db, cfg);
        let now = seed_weekly_milk(&engine);

        let plans = engine.plan_suggestions(7, now + MS_PER_DAY).expect("plan");
        assert_eq!(plans.len(), 1);
        assert_eq!(bin_of_day(plans[0].fire_at, 0), 20, "shifted to the quiet window's end");
    }

    #[test]
    fn test_quiet_hours_drop_when_shift_crosses_midnight() {
        let db = test_db();
        let cfg = EngineConfig {
            // 21:00 → 07:00 wrapping window
            quiet_hours: Some(QuietHours { start_bin: 42, end_bin: 14 }),
            ..Default::default()
        };
        let engine = PatternEngine::new(&db, cfg);
        // Habit at 22:00 (bin 44), inside the wrapping tail
        let evening = crate::util::day_start(MONDAY_0930, 0) + 44 * crate::util::BIN_MS;
        for i in 0..4 {
            engine
                .log_task_creation(&creation("journal", evening - (3 - i) * MS_PER_WEEK))
                .unwrap();
        }

        let plans = engine.plan_suggestions(7, evening + MS_PER_DAY).expect("plan");
        assert!(plans.is_empty(), "shift across midnight drops the occurrence");
    }

    #[test]
    fn test_handle_response_lifecycle() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let now = seed_weekly_milk(&engine);

        // Three ignores pause the pattern
        for _ in 0..3 {
            engine
                .handle_response("buy milk::1", UserResponse::Ignored, now)
                .unwrap();
        }
        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert_eq!(model.ignored_count, 3);
        assert!(!engine.should_watch(&model, now));

        // Accepting resets the counter
        engine
            .handle_response("buy milk::1", UserResponse::Accepted, now)
            .unwrap();
        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert_eq!(model.ignored_count, 0);
        assert_eq!(model.last_user_response, Some(UserResponse::Accepted));
        assert!(engine.should_watch(&model, now));

        // Dismissal anchors the cooldown at now
        engine
            .handle_response("buy milk::1", UserResponse::Dismissed, now)
            .unwrap();
        let model = db.get_pattern("buy milk::1").unwrap().unwrap();
        assert_eq!(model.last_suggested_at, Some(now));
        assert!(!engine.should_watch(&model, now + MS_PER_DAY));
    }

    #[test]
    fn test_handle_response_unknown_pattern() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        let err = engine
            .handle_response("nothing::0", UserResponse::Accepted, 0)
            .expect_err("unknown key");
        assert!(matches!(err, EngineError::PatternNotFound(_)));
    }

    #[test]
    fn test_task_exists_for_pattern() {
        let db = test_db();
        let engine = PatternEngine::new(&db, EngineConfig::default());
        seed_weekly_milk(&engine);

        assert!(engine.task_exists_for_pattern("buy milk::1", "2026-W32").unwrap());
        assert!(!engine.task_exists_for_pattern("buy milk::1", "2026-W33").unwrap());
    }
}
