//! Snooze option ladder built from learned reaction times.

use super::SlotEngine;
use crate::types::{SlotKey, SnoozeOption};
use crate::util::{bin_label, BINS_PER_DAY, MS_PER_MIN};

/// Snap-to grid for the reaction-time-derived option, in minutes.
const GRID: [i64; 6] = [5, 10, 15, 30, 60, 120];
/// Padding when the learned options run short.
const FALLBACK: [i64; 4] = [15, 30, 60, 120];
const MAX_OPTIONS: usize = 3;

impl SlotEngine<'_> {
    /// Up to three snooze durations for a notification shown in this slot:
    /// the learned median reaction snapped to a fixed grid, double that,
    /// and the next slot the user is usually responsive in. Fixed fallbacks
    /// pad the list, so the caller always gets something usable.
    pub fn snooze_options(&self, category: &str, day_of_week: u8, bin: u8) -> Vec<SnoozeOption> {
        let stats = self
            .db
            .slot_stats_or_default(&SlotKey::new(category, day_of_week, bin));

        let mut options: Vec<SnoozeOption> = Vec::with_capacity(MAX_OPTIONS);

        let median_min = (stats.median_rt_ms() / MS_PER_MIN as f64).round() as i64;
        let first = round_to_grid(median_min);
        options.push(SnoozeOption {
            minutes: first,
            label: fmt_label(first),
            reason: "Matches your usual reaction time".to_string(),
        });

        let second = first * 2;
        if second != first {
            options.push(SnoozeOption {
                minutes: second,
                label: fmt_label(second),
                reason: "A little more breathing room".to_string(),
            });
        }

        // Next responsive slot within 24h, strictly past the second option
        let threshold = options.last().map(|o| o.minutes).unwrap_or(first);
        for k in 1..=BINS_PER_DAY as i64 {
            let offset_min = k * 30;
            if offset_min <= threshold {
                continue;
            }
            if offset_min > 24 * 60 {
                break;
            }
            let total = bin as i64 + k;
            let d = ((day_of_week as i64 + total / BINS_PER_DAY as i64) % 7) as u8;
            let b = (total % BINS_PER_DAY as i64) as u8;
            let s = self.db.slot_stats_or_default(&SlotKey::new(category, d, b));
            if s.p_open_5m() > 0.5 {
                options.push(SnoozeOption {
                    minutes: offset_min,
                    label: fmt_label(offset_min),
                    reason: format!("You're usually responsive around {}", bin_label(b)),
                });
                break;
            }
        }

        for fallback in FALLBACK {
            if options.len() >= MAX_OPTIONS {
                break;
            }
            if options.iter().any(|o| o.minutes == fallback) {
                continue;
            }
            options.push(SnoozeOption {
                minutes: fallback,
                label: fmt_label(fallback),
                reason: "Standard snooze".to_string(),
            });
        }

        options.truncate(MAX_OPTIONS);
        options
    }
}

fn round_to_grid(minutes: i64) -> i64 {
    *GRID
        .iter()
        .min_by_key(|g| (*g - minutes).abs())
        .unwrap_or(&15)
}

fn fmt_label(minutes: i64) -> String {
    if minutes % 60 == 0 && minutes >= 60 {
        let hours = minutes / 60;
        if hours == 1 {
            "In 1 hour".to_string()
        } else {
            format!("In {} hours", hours)
        }
    } else {
        format!("In {} min", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::db::test_utils::test_db;
    use crate::db::SlotStats;

    #[test]
    fn test_round_to_grid() {
        assert_eq!(round_to_grid(1), 5);
        assert_eq!(round_to_grid(12), 10);
        assert_eq!(round_to_grid(14), 15);
        assert_eq!(round_to_grid(40), 30);
        assert_eq!(round_to_grid(500), 120);
    }

    #[test]
    fn test_cold_slot_gets_default_ladder() {
        let db = test_db();
        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let options = engine.snooze_options("Work", 2, 18);

        // Prior median is 15 min → 15, 30, then the 60-minute fallback
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].minutes, 15);
        assert_eq!(options[1].minutes, 30);
        assert_eq!(options[2].minutes, 60);
        assert_eq!(options[0].label, "In 15 min");
        assert_eq!(options[2].label, "In 1 hour");
    }

    #[test]
    fn test_fast_reactor_gets_short_ladder() {
        let db = test_db();
        let mut stats = SlotStats::fresh("Work:2:18", "Work", 2, 18);
        stats.ln_rt_mean = (4.0 * MS_PER_MIN as f64).ln(); // ~4 min median
        db.upsert_slot_stats(&stats).unwrap();

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let options = engine.snooze_options("Work", 2, 18);
        assert_eq!(options[0].minutes, 5);
        assert_eq!(options[1].minutes, 10);
    }

    #[test]
    fn test_responsive_slot_becomes_third_option() {
        let db = test_db();
        // Two hours after (2, 18) sits a highly responsive slot
        let mut hot = SlotStats::fresh("Work:2:22", "Work", 2, 22);
        hot.open5m_alpha = 9.0;
        hot.open5m_beta = 1.0; // p5 = 0.9
        db.upsert_slot_stats(&hot).unwrap();

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let options = engine.snooze_options("Work", 2, 18);
        assert_eq!(options.len(), 3);
        // 15, 30, then the hot slot two hours out
        assert_eq!(options[2].minutes, 120);
        assert!(options[2].reason.contains("11:00"));
    }

    #[test]
    fn test_responsive_slot_must_be_beyond_second_option() {
        let db = test_db();
        // Responsive slot only 30 minutes out — not strictly beyond option 2
        let mut hot = SlotStats::fresh("Work:2:19", "Work", 2, 19);
        hot.open5m_alpha = 9.0;
        hot.open5m_beta = 1.0;
        db.upsert_slot_stats(&hot).unwrap();

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let options = engine.snooze_options("Work", 2, 18);
        assert_eq!(options[2].minutes, 60, "30-minute slot is not beyond the 30-minute option");
    }

    #[test]
    fn test_day_wraps_into_next_morning() {
        let db = test_db();
        // Saturday 23:30 (dow 6, bin 47) + 1 bin lands on Sunday bin 0
        let mut hot = SlotStats::fresh("Work:0:3", "Work", 0, 3);
        hot.open5m_alpha = 9.0;
        hot.open5m_beta = 1.0;
        db.upsert_slot_stats(&hot).unwrap();

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let options = engine.snooze_options("Work", 6, 47);
        // bin 47 + 4 bins = Sunday bin 3, offset 120 min > second option 30
        assert!(options.iter().any(|o| o.minutes == 120 && o.reason.contains("01:30")));
    }
}
