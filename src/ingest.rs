//! Event ingest: raw app-shell payloads → canonical engine records.
//!
//! A thin adapter. Unknown actions are rejected with a warning; everything
//! else is trimmed, clamped, and stamped — no learning logic lives here.

use uuid::Uuid;

use crate::types::{NotifyAction, NotifyLogEvent, TaskCreation};
use crate::util::{bin_of_day, day_of_week};

/// A notification interaction as the app shell reports it.
#[derive(Debug, Clone)]
pub struct RawInteraction {
    pub task_id: String,
    pub category: String,
    pub delivered_at: i64,
    pub opened_at: Option<i64>,
    /// Action name, e.g. `"open"` or `"complete_from_push"`.
    pub action: String,
    pub priority01: f64,
    pub due_in_min_at_delivery: Option<i64>,
    pub is_silent: bool,
}

/// Normalize a raw interaction into a canonical [`NotifyLogEvent`].
///
/// Returns `None` for unrecognized actions. An opened-style action missing
/// its open timestamp is kept but will fold in as unopened.
pub fn normalize_interaction(raw: &RawInteraction, tz_offset_min: i32) -> Option<NotifyLogEvent> {
    let action = match NotifyAction::parse(raw.action.trim()) {
        Some(a) => a,
        None => {
            log::warn!("ingest: dropping interaction with unknown action {:?}", raw.action);
            return None;
        }
    };

    if action.is_opened() && raw.opened_at.is_none() {
        log::warn!(
            "ingest: {} event for task {} has no open timestamp",
            action.as_str(),
            raw.task_id
        );
    }

    let priority01 = if raw.priority01.is_finite() {
        raw.priority01.clamp(0.0, 1.0)
    } else {
        0.5
    };

    Some(NotifyLogEvent {
        id: format!("nl-{}", Uuid::new_v4()),
        task_id: raw.task_id.trim().to_string(),
        category: raw.category.trim().to_string(),
        delivered_at: raw.delivered_at,
        opened_at: raw.opened_at.filter(|at| *at >= raw.delivered_at),
        action,
        day_of_week: day_of_week(raw.delivered_at, tz_offset_min),
        hour_bin: bin_of_day(raw.delivered_at, tz_offset_min),
        priority01,
        due_in_min_at_delivery: raw.due_in_min_at_delivery,
        is_silent: raw.is_silent,
    })
}

/// A task creation as the app shell reports it.
#[derive(Debug, Clone)]
pub struct RawTaskCreation {
    pub title: String,
    pub category: String,
    pub due_at: Option<i64>,
    pub created_at: i64,
}

/// Normalize a raw creation. Blank titles are dropped here; titles that
/// normalize to nothing are the detector's no-op case.
pub fn normalize_task_creation(raw: &RawTaskCreation) -> Option<TaskCreation> {
    let title = raw.title.trim();
    if title.is_empty() {
        return None;
    }
    Some(TaskCreation {
        title: title.to_string(),
        category: raw.category.trim().to_string(),
        due_at: raw.due_at,
        created_at: raw.created_at,
    })
}
