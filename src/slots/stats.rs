//! Online statistics updates for delivered-notification outcomes.
//!
//! Each event folds into both its slot record and the global aggregate with
//! a recency weight, inside one transaction. The math is online and
//! order-dependent, so tests fix an event sequence and assert exact values.

use super::decay::recency_weight;
use super::SlotEngine;
use crate::db::{DbError, SlotStats};
use crate::error::EngineError;
use crate::types::NotifyLogEvent;
use crate::util::{BINS_PER_DAY, MS_PER_MIN};

/// Reaction times below one second are clock noise.
const RT_FLOOR_MS: i64 = 1_000;
const OPEN_5M_MS: i64 = 5 * MS_PER_MIN;
const OPEN_30M_MS: i64 = 30 * MS_PER_MIN;

/// Fold one event into an aggregate with recency weight `w`.
pub(super) fn apply_event(stats: &mut SlotStats, ev: &NotifyLogEvent, w: f64, now_ms: i64) {
    let opened = ev.action.is_opened() && ev.opened_at.is_some();
    let rt_ms = if opened {
        Some((ev.opened_at.unwrap_or(ev.delivered_at) - ev.delivered_at).max(RT_FLOOR_MS))
    } else {
        None
    };

    // Beta counters: an unopened delivery is a miss at both thresholds
    match rt_ms {
        Some(rt) if rt <= OPEN_5M_MS => stats.open5m_alpha += w,
        _ => stats.open5m_beta += w,
    }
    match rt_ms {
        Some(rt) if rt <= OPEN_30M_MS => stats.open30m_alpha += w,
        _ => stats.open30m_beta += w,
    }

    if let Some(rt) = rt_ms {
        // Recency-weighted Welford update of ln(reaction time)
        let x = (rt as f64).ln();
        let alpha = w / (stats.weight + w);
        let mean_old = stats.ln_rt_mean;
        let mean_new = mean_old + alpha * (x - mean_old);
        stats.ln_rt_var =
            (1.0 - alpha) * (stats.ln_rt_var + alpha * (x - mean_old) * (x - mean_new));
        stats.ln_rt_mean = mean_new;
        stats.opened += 1;
    } else {
        stats.ignored += 1;
    }

    stats.delivered += 1;
    stats.weight += w;
    stats.last_update_at = now_ms;
}

impl SlotEngine<'_> {
    /// Consume one interaction event: append it to the notification log and
    /// fold it into the slot and global aggregates, atomically.
    ///
    /// A previously consumed event id fails with
    /// [`EngineError::DuplicateEvent`] and leaves every aggregate untouched.
    pub fn log_event(&self, ev: &NotifyLogEvent, now_ms: i64) -> Result<(), EngineError> {
        if ev.day_of_week > 6 || ev.hour_bin >= BINS_PER_DAY {
            return Err(EngineError::InvalidEvent(format!(
                "slot out of range: dow={} bin={}",
                ev.day_of_week, ev.hour_bin
            )));
        }
        if !ev.priority01.is_finite() {
            return Err(EngineError::InvalidEvent("non-finite priority".to_string()));
        }

        let age = (now_ms - ev.delivered_at).max(0);
        let w = recency_weight(age, self.cfg.half_life_ms);

        self.db.with_transaction(|db| {
            if let Err(e) = db.insert_notify_log(ev, now_ms) {
                return Err(match e {
                    DbError::Sqlite(rusqlite::Error::SqliteFailure(inner, _))
                        if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        EngineError::DuplicateEvent(ev.id.clone())
                    }
                    other => EngineError::Db(other),
                });
            }

            let mut slot = db.slot_stats_or_default(&ev.slot_key());
            apply_event(&mut slot, ev, w, now_ms);
            db.upsert_slot_stats(&slot)?;

            let mut global = db.global_stats_or_default();
            apply_event(&mut global, ev, w, now_ms);
            db.upsert_slot_stats(&global)?;

            log::debug!(
                "slot_stats: {} {} w={:.3} p5={:.3}",
                ev.slot_key().storage_key(),
                ev.action.as_str(),
                w,
                slot.p_open_5m(),
            );
            Ok(())
        })
    }
}
