//! Focus windows: the slots where this category reliably lands.

use super::SlotEngine;
use crate::types::FocusWindow;

const MIN_P_OPEN_5M: f64 = 0.4;
const MAX_WINDOWS: usize = 10;

impl SlotEngine<'_> {
    /// The top slots (across all 7×48 combinations) where at least
    /// `min_samples` deliveries landed and at least 40% opened within five
    /// minutes, best first. Only stored rows can clear the sample floor, so
    /// the scan walks the category's rows rather than synthesizing 336
    /// priors. Unreadable rows are skipped.
    pub fn focus_windows(&self, category: &str) -> Vec<FocusWindow> {
        let rows = match self.db.slot_stats_for_category(category) {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("focus_windows: scan failed for {}: {}", category, e);
                return Vec::new();
            }
        };

        let mut windows: Vec<FocusWindow> = rows
            .into_iter()
            .filter(|s| s.delivered >= self.cfg.min_samples as i64)
            .filter(|s| s.p_open_5m() >= MIN_P_OPEN_5M)
            .map(|s| FocusWindow {
                category: category.to_string(),
                day_of_week: s.day_of_week,
                start_bin: s.bin,
                end_bin: s.bin.saturating_add(1),
                p_open_5m: s.p_open_5m(),
                median_rt_ms: s.median_rt_ms(),
                confidence: s.confidence(self.cfg.min_samples),
            })
            .collect();

        windows.sort_by(|a, b| b.p_open_5m.total_cmp(&a.p_open_5m));
        windows.truncate(MAX_WINDOWS);
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::db::test_utils::test_db;
    use crate::db::SlotStats;
    use crate::types::SlotKey;

    fn seeded_stats(dow: u8, bin: u8, alpha: f64, beta: f64, delivered: i64) -> SlotStats {
        let key = SlotKey::new("Work", dow, bin);
        let mut stats = SlotStats::fresh_for(&key);
        stats.open5m_alpha = alpha;
        stats.open5m_beta = beta;
        stats.delivered = delivered;
        stats
    }

    #[test]
    fn test_filters_by_samples_and_rate() {
        let db = test_db();
        // Qualifies: 10 deliveries, p5 = 0.6
        db.upsert_slot_stats(&seeded_stats(2, 18, 6.0, 4.0, 10)).unwrap();
        // Too few samples
        db.upsert_slot_stats(&seeded_stats(3, 20, 6.0, 4.0, 2)).unwrap();
        // Enough samples but p5 = 0.2
        db.upsert_slot_stats(&seeded_stats(4, 22, 2.0, 8.0, 10)).unwrap();

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let windows = engine.focus_windows("Work");
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].day_of_week, 2);
        assert_eq!(windows[0].start_bin, 18);
        assert_eq!(windows[0].end_bin, 19);
        assert!((windows[0].p_open_5m - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_best_first_and_capped_at_ten() {
        let db = test_db();
        for bin in 0..14u8 {
            // p5 climbs with the bin number
            let alpha = 4.0 + bin as f64;
            db.upsert_slot_stats(&seeded_stats(1, bin, alpha, 4.0, 10)).unwrap();
        }

        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        let windows = engine.focus_windows("Work");
        assert_eq!(windows.len(), 10);
        assert_eq!(windows[0].start_bin, 13, "highest p5 first");
        for pair in windows.windows(2) {
            assert!(pair[0].p_open_5m >= pair[1].p_open_5m);
        }
    }

    #[test]
    fn test_empty_category_returns_empty() {
        let db = test_db();
        let engine = SlotEngine::with_seed(&db, EngineConfig::default(), 1);
        assert!(engine.focus_windows("Nothing").is_empty());
    }
}
