use rusqlite::{params, Row};

use super::*;
use crate::types::{NotifyLogEvent, SlotKey, GLOBAL_SLOT_KEY};

fn map_slot_row(row: &Row) -> rusqlite::Result<SlotStats> {
    Ok(SlotStats {
        slot_key: row.get(0)?,
        category: row.get(1)?,
        day_of_week: row.get::<_, i64>(2)? as u8,
        bin: row.get::<_, i64>(3)? as u8,
        open5m_alpha: row.get(4)?,
        open5m_beta: row.get(5)?,
        open30m_alpha: row.get(6)?,
        open30m_beta: row.get(7)?,
        ln_rt_mean: row.get(8)?,
        ln_rt_var: row.get(9)?,
        weight: row.get(10)?,
        delivered: row.get(11)?,
        opened: row.get(12)?,
        ignored: row.get(13)?,
        last_update_at: row.get(14)?,
    })
}

const SLOT_COLUMNS: &str = "slot_key, category, day_of_week, bin,
    open5m_alpha, open5m_beta, open30m_alpha, open30m_beta,
    ln_rt_mean, ln_rt_var, weight, delivered, opened, ignored, last_update_at";

impl EngineDb {
    /// Load slot statistics by storage key.
    pub fn get_slot_stats(&self, slot_key: &str) -> Result<Option<SlotStats>, DbError> {
        match self.conn.query_row(
            &format!("SELECT {} FROM slot_stats WHERE slot_key = ?1", SLOT_COLUMNS),
            params![slot_key],
            map_slot_row,
        ) {
            Ok(stats) => Ok(Some(stats)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Sqlite(e)),
        }
    }

    /// Load a slot's statistics, synthesizing the documented prior when the
    /// record is missing or unreadable. Read paths never fail over one key.
    pub fn slot_stats_or_default(&self, key: &SlotKey) -> SlotStats {
        match self.get_slot_stats(&key.storage_key()) {
            Ok(Some(stats)) => stats,
            Ok(None) => SlotStats::fresh_for(key),
            Err(e) => {
                log::warn!("slot_stats: unreadable record {}: {}", key.storage_key(), e);
                SlotStats::fresh_for(key)
            }
        }
    }

    /// Load the all-categories aggregate, synthesizing the prior if absent.
    pub fn global_stats_or_default(&self) -> SlotStats {
        match self.get_slot_stats(GLOBAL_SLOT_KEY) {
            Ok(Some(stats)) => stats,
            Ok(None) => SlotStats::fresh(GLOBAL_SLOT_KEY, "", 0, 0),
            Err(e) => {
                log::warn!("slot_stats: unreadable global aggregate: {}", e);
                SlotStats::fresh(GLOBAL_SLOT_KEY, "", 0, 0)
            }
        }
    }

    /// Write a slot's statistics (insert or full-row update).
    pub fn upsert_slot_stats(&self, stats: &SlotStats) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO slot_stats
                (slot_key, category, day_of_week, bin,
                 open5m_alpha, open5m_beta, open30m_alpha, open30m_beta,
                 ln_rt_mean, ln_rt_var, weight, delivered, opened, ignored, last_update_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT (slot_key) DO UPDATE SET
                open5m_alpha = excluded.open5m_alpha,
                open5m_beta = excluded.open5m_beta,
                open30m_alpha = excluded.open30m_alpha,
                open30m_beta = excluded.open30m_beta,
                ln_rt_mean = excluded.ln_rt_mean,
                ln_rt_var = excluded.ln_rt_var,
                weight = excluded.weight,
                delivered = excluded.delivered,
                opened = excluded.opened,
                ignored = excluded.ignored,
                last_update_at = excluded.last_update_at",
            params![
                stats.slot_key,
                stats.category,
                stats.day_of_week as i64,
                stats.bin as i64,
                stats.open5m_alpha,
                stats.open5m_beta,
                stats.open30m_alpha,
                stats.open30m_beta,
                stats.ln_rt_mean,
                stats.ln_rt_var,
                stats.weight,
                stats.delivered,
                stats.opened,
                stats.ignored,
                stats.last_update_at,
            ],
        )?;
        Ok(())
    }

    /// All stored slot rows for a category. Unreadable rows are logged and
    /// skipped so a scan never aborts over one bad entry.
    pub fn slot_stats_for_category(&self, category: &str) -> Result<Vec<SlotStats>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM slot_stats WHERE category = ?1 ORDER BY day_of_week, bin",
            SLOT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![category], map_slot_row)?;

        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok(stats) => out.push(stats),
                Err(e) => log::warn!("slot_stats: skipping unreadable row in {}: {}", category, e),
            }
        }
        Ok(out)
    }

    /// Append an interaction to the immutable notification log. A duplicate
    /// id fails with a constraint error — each event is consumed once.
    pub fn insert_notify_log(&self, ev: &NotifyLogEvent, logged_at: i64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO notify_log
                (id, task_id, category, delivered_at, opened_at, action,
                 day_of_week, hour_bin, priority, due_in_min, is_silent, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                ev.id,
                ev.task_id,
                ev.category,
                ev.delivered_at,
                ev.opened_at,
                ev.action.as_str(),
                ev.day_of_week as i64,
                ev.hour_bin as i64,
                ev.priority01,
                ev.due_in_min_at_delivery,
                ev.is_silent as i64,
                logged_at,
            ],
        )?;
        Ok(())
    }
}
