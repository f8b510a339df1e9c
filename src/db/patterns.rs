use rusqlite::{params, Row};

use super::*;

/// Decode one pattern row. The occurrence ring and cluster set live in JSON
/// columns; undecodable JSON surfaces as `DbError::Corrupt` so scans can
/// skip the record instead of aborting.
fn map_pattern_row(row: &Row) -> rusqlite::Result<(PatternModel, Option<String>)> {
    let pattern_key: String = row.get(0)?;
    let occurrences_json: String = row.get(5)?;
    let clusters_json: String = row.get(6)?;
    let cadence_str: String = row.get(9)?;
    let response_str: Option<String> = row.get(11)?;

    let mut corrupt: Option<String> = None;
    let occurrences: Vec<Occurrence> = match serde_json::from_str(&occurrences_json) {
        Ok(v) => v,
        Err(e) => {
            corrupt = Some(format!("occurrences: {}", e));
            Vec::new()
        }
    };
    let clusters: Vec<TimeCluster> = match serde_json::from_str(&clusters_json) {
        Ok(v) => v,
        Err(e) => {
            corrupt = Some(format!("clusters: {}", e));
            Vec::new()
        }
    };

    let model = PatternModel {
        pattern_key,
        category: row.get(1)?,
        display_title: row.get(2)?,
        normalized_title: row.get(3)?,
        target_dow: row.get::<_, i64>(4)? as u8,
        occurrences,
        clusters,
        ewma_bin: row.get::<_, i64>(7)? as u8,
        ewma_weight: row.get(8)?,
        cadence: crate::types::Cadence::parse(&cadence_str),
        last_suggested_at: row.get(10)?,
        last_user_response: response_str.as_deref().and_then(crate::types::UserResponse::parse),
        ignored_count: row.get::<_, i64>(12)? as u32,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    };
    Ok((model, corrupt))
}

const PATTERN_COLUMNS: &str = "pattern_key, category, display_title, normalized_title, target_dow,
    occurrences, clusters, ewma_bin, ewma_weight, cadence,
    last_suggested_at, last_user_response, ignored_count, created_at, updated_at";

impl EngineDb {
    /// Load a pattern model by key.
    pub fn get_pattern(&self, pattern_key: &str) -> Result<Option<PatternModel>, DbError> {
        match self.conn.query_row(
            &format!("SELECT {} FROM pattern_models WHERE pattern_key = ?1", PATTERN_COLUMNS),
            params![pattern_key],
            map_pattern_row,
        ) {
            Ok((model, None)) => Ok(Some(model)),
            Ok((model, Some(detail))) => Err(DbError::Corrupt {
                key: model.pattern_key,
                detail,
            }),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Sqlite(e)),
        }
    }

    /// Write a pattern model (insert or full-row update).
    pub fn upsert_pattern(&self, model: &PatternModel) -> Result<(), DbError> {
        let occurrences_json =
            serde_json::to_string(&model.occurrences).unwrap_or_else(|_| "[]".to_string());
        let clusters_json =
            serde_json::to_string(&model.clusters).unwrap_or_else(|_| "[]".to_string());

        self.conn.execute(
            "INSERT INTO pattern_models
                (pattern_key, category, display_title, normalized_title, target_dow,
                 occurrences, clusters, ewma_bin, ewma_weight, cadence,
                 last_suggested_at, last_user_response, ignored_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT (pattern_key) DO UPDATE SET
                category = excluded.category,
                display_title = excluded.display_title,
                normalized_title = excluded.normalized_title,
                target_dow = excluded.target_dow,
                occurrences = excluded.occurrences,
                clusters = excluded.clusters,
                ewma_bin = excluded.ewma_bin,
                ewma_weight = excluded.ewma_weight,
                cadence = excluded.cadence,
                last_suggested_at = excluded.last_suggested_at,
                last_user_response = excluded.last_user_response,
                ignored_count = excluded.ignored_count,
                updated_at = excluded.updated_at",
            params![
                model.pattern_key,
                model.category,
                model.display_title,
                model.normalized_title,
                model.target_dow as i64,
                occurrences_json,
                clusters_json,
                model.ewma_bin as i64,
                model.ewma_weight,
                model.cadence.as_str(),
                model.last_suggested_at,
                model.last_user_response.map(|r| r.as_str()),
                model.ignored_count as i64,
                model.created_at,
                model.updated_at,
            ],
        )?;
        Ok(())
    }

    /// All patterns in a category. Corrupt records are logged and skipped.
    pub fn patterns_for_category(&self, category: &str) -> Result<Vec<PatternModel>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pattern_models WHERE category = ?1 ORDER BY pattern_key",
            PATTERN_COLUMNS
        ))?;
        let rows = stmt.query_map(params![category], map_pattern_row)?;
        Ok(Self::collect_patterns(rows))
    }

    /// Every stored pattern. Corrupt records are logged and skipped.
    pub fn all_patterns(&self) -> Result<Vec<PatternModel>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pattern_models ORDER BY pattern_key",
            PATTERN_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_pattern_row)?;
        Ok(Self::collect_patterns(rows))
    }

    fn collect_patterns(
        rows: impl Iterator<Item = rusqlite::Result<(PatternModel, Option<String>)>>,
    ) -> Vec<PatternModel> {
        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok((model, None)) => out.push(model),
                Ok((model, Some(detail))) => {
                    log::warn!("patterns: skipping corrupt record {}: {}", model.pattern_key, detail);
                }
                Err(e) => log::warn!("patterns: skipping unreadable row: {}", e),
            }
        }
        out
    }

    /// Explicit user deletion. Returns true when a record was removed.
    pub fn delete_pattern(&self, pattern_key: &str) -> Result<bool, DbError> {
        let n = self.conn.execute(
            "DELETE FROM pattern_models WHERE pattern_key = ?1",
            params![pattern_key],
        )?;
        Ok(n > 0)
    }
}
