//! Task-creation ingestion: fuzzy pattern merging, EWMA bin tracking, and
//! bounded time-cluster maintenance.

use super::cadence;
use super::normalize::{day_mentioned_in_title, normalize_title, trigram_jaccard};
use super::PatternEngine;
use crate::db::{Occurrence, PatternModel, TimeCluster};
use crate::error::EngineError;
use crate::types::TaskCreation;
use crate::util::{bin_of_day, day_of_week, weeks_between, year_week};

/// Weekly multiplicative decay applied to cluster weights.
const CLUSTER_DECAY_PER_WEEK: f64 = 0.9;

/// Weight of a cluster as of `now`. Stored weights are un-decayed; readers
/// apply the decay from `last_seen_at` so elapsed time is never compounded.
pub(super) fn cluster_weight(cluster: &TimeCluster, now_ms: i64) -> f64 {
    let weeks = weeks_between(cluster.last_seen_at, now_ms).max(0.0);
    cluster.weight * CLUSTER_DECAY_PER_WEEK.powf(weeks)
}

/// Fold a creation bin into the cluster set: join the nearest cluster within
/// `radius` bins (weighted running average of the center), otherwise open a
/// new one. Only the top `cap` by decayed weight survive.
fn update_clusters(
    clusters: &mut Vec<TimeCluster>,
    creation_bin: u8,
    now_ms: i64,
    radius: f64,
    cap: usize,
) {
    let target = creation_bin as f64;

    let nearest = clusters
        .iter()
        .enumerate()
        .filter(|(_, c)| (c.bin - target).abs() <= radius)
        .min_by(|(_, a), (_, b)| (a.bin - target).abs().total_cmp(&(b.bin - target).abs()))
        .map(|(i, _)| i);

    match nearest {
        Some(i) => {
            let w = cluster_weight(&clusters[i], now_ms);
            let cluster = &mut clusters[i];
            cluster.bin = (cluster.bin * w + target) / (w + 1.0);
            cluster.weight = w + 1.0;
            cluster.last_seen_at = now_ms;
        }
        None => clusters.push(TimeCluster {
            bin: target,
            weight: 1.0,
            last_seen_at: now_ms,
        }),
    }

    clusters.sort_by(|a, b| cluster_weight(b, now_ms).total_cmp(&cluster_weight(a, now_ms)));
    clusters.truncate(cap);
}

impl PatternEngine<'_> {
    /// Fold one task creation into the pattern store.
    ///
    /// Returns the pattern key the creation landed in, or `None` when the
    /// title normalizes to nothing. The whole update — occurrence append,
    /// EWMA bin, clusters, cadence — is one transaction.
    pub fn log_task_creation(&self, ev: &TaskCreation) -> Result<Option<String>, EngineError> {
        let normalized = normalize_title(&ev.title);
        if normalized.is_empty() {
            return Ok(None);
        }

        let tz = self.cfg.tz_offset_min;
        let target_dow = ev
            .due_at
            .map(|due| day_of_week(due, tz))
            .or_else(|| day_mentioned_in_title(&ev.title))
            .unwrap_or_else(|| day_of_week(ev.created_at, tz));

        let key = format!("{}::{}", normalized, target_dow);

        let mut model = match self.load_pattern_tolerant(&key) {
            Some(model) => model,
            None => match self.find_merge_target(&ev.category, &normalized, target_dow) {
                Some(existing) => {
                    log::info!(
                        "patterns: merged \"{}\" into {} (fuzzy title match)",
                        ev.title.trim(),
                        existing.pattern_key,
                    );
                    existing
                }
                None => PatternModel::new(
                    &key,
                    &ev.category,
                    ev.title.trim(),
                    &normalized,
                    target_dow,
                    ev.created_at,
                ),
            },
        };

        let creation_bin = bin_of_day(ev.created_at, tz);
        let occurrence = Occurrence {
            year_week: year_week(ev.created_at, tz),
            creation_day_of_week: day_of_week(ev.created_at, tz),
            creation_bin,
            created_at: ev.created_at,
        };

        // EWMA bin: recent creations dominate after a long silence
        match model.occurrences.last() {
            Some(prev) => {
                let delta_weeks = weeks_between(prev.created_at, ev.created_at).max(0.0);
                let alpha = (-delta_weeks / self.cfg.ewma_half_life_weeks).exp();
                let blended =
                    (1.0 - alpha) * model.ewma_bin as f64 + alpha * creation_bin as f64;
                model.ewma_bin = blended.round() as u8;
                model.ewma_weight += alpha;
            }
            None => {
                model.ewma_bin = creation_bin;
                model.ewma_weight = 1.0;
            }
        }

        model.push_occurrence(occurrence, self.cfg.max_occurrences);
        update_clusters(
            &mut model.clusters,
            creation_bin,
            ev.created_at,
            self.cfg.cluster_merge_radius,
            self.cfg.max_clusters,
        );
        model.cadence = cadence::classify(&model.occurrences);
        model.display_title = ev.title.trim().to_string();
        model.updated_at = ev.created_at;

        let key = model.pattern_key.clone();
        self.db
            .with_transaction(|db| db.upsert_pattern(&model).map_err(EngineError::from))?;
        Ok(Some(key))
    }

    /// Explicit user deletion of a pattern.
    pub fn delete_pattern(&self, pattern_key: &str) -> Result<bool, EngineError> {
        Ok(self.db.delete_pattern(pattern_key)?)
    }

    /// Load a pattern, treating a corrupt record as absent (it will be
    /// rebuilt from scratch rather than poisoning the update).
    fn load_pattern_tolerant(&self, key: &str) -> Option<PatternModel> {
        match self.db.get_pattern(key) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("patterns: ignoring unreadable record {}: {}", key, e);
                None
            }
        }
    }

    /// Find an existing same-category, same-target-day pattern whose
    /// normalized title is a near-duplicate (trigram Jaccard at or above the
    /// merge threshold). Among several, the closest by edit distance wins.
    fn find_merge_target(
        &self,
        category: &str,
        normalized: &str,
        target_dow: u8,
    ) -> Option<PatternModel> {
        let candidates = match self.db.patterns_for_category(category) {
            Ok(models) => models,
            Err(e) => {
                log::warn!("patterns: merge scan failed for {}: {}", category, e);
                return None;
            }
        };

        candidates
            .into_iter()
            .filter(|m| m.target_dow == target_dow)
            .filter_map(|m| {
                let jaccard = trigram_jaccard(&m.normalized_title, normalized);
                if jaccard >= self.cfg.merge_similarity {
                    let edit = strsim::normalized_levenshtein(&m.normalized_title, normalized);
                    Some((m, jaccard, edit))
                } else {
                    None
                }
            })
            .max_by(|(_, ja, ea), (_, jb, eb)| {
                ja.total_cmp(jb).then(ea.total_cmp(eb))
            })
            .map(|(m, _, _)| m)
    }
}
