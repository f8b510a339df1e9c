//! Shared domain types: canonical events consumed by the engines and the
//! records they produce for the notification scheduler.
//!
//! Everything here is serde-serializable (camelCase) so the app shell can
//! pass records across its IPC boundary unchanged.

use serde::{Deserialize, Serialize};

use crate::util;

/// Reserved storage key for the all-categories aggregate row.
pub const GLOBAL_SLOT_KEY: &str = "__global__";

// ---------------------------------------------------------------------------
// Slot identity
// ---------------------------------------------------------------------------

/// Addressable unit of learned statistics: (category, day-of-week, bin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub category: String,
    /// 0=Sunday .. 6=Saturday.
    pub day_of_week: u8,
    /// 30-minute bin, 0..47.
    pub bin: u8,
}

impl SlotKey {
    pub fn new(category: &str, day_of_week: u8, bin: u8) -> Self {
        Self {
            category: category.to_string(),
            day_of_week,
            bin,
        }
    }

    /// Deterministic storage key, `category:dow:bin`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.category, self.day_of_week, self.bin)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What the user did with a delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyAction {
    Open,
    CompleteFromPush,
    Snooze,
    Dismiss,
    Ignore,
}

impl NotifyAction {
    /// Opening and completing straight from the push both count as opened.
    pub fn is_opened(self) -> bool {
        matches!(self, NotifyAction::Open | NotifyAction::CompleteFromPush)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotifyAction::Open => "open",
            NotifyAction::CompleteFromPush => "complete_from_push",
            NotifyAction::Snooze => "snooze",
            NotifyAction::Dismiss => "dismiss",
            NotifyAction::Ignore => "ignore",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(NotifyAction::Open),
            "complete_from_push" | "completeFromPush" => Some(NotifyAction::CompleteFromPush),
            "snooze" => Some(NotifyAction::Snooze),
            "dismiss" => Some(NotifyAction::Dismiss),
            "ignore" => Some(NotifyAction::Ignore),
            _ => None,
        }
    }
}

/// Canonical record of one notification interaction. Immutable; appended to
/// `notify_log` and folded into slot statistics exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyLogEvent {
    pub id: String,
    pub task_id: String,
    pub category: String,
    pub delivered_at: i64,
    pub opened_at: Option<i64>,
    pub action: NotifyAction,
    pub day_of_week: u8,
    pub hour_bin: u8,
    /// Task priority mapped into [0,1].
    pub priority01: f64,
    pub due_in_min_at_delivery: Option<i64>,
    pub is_silent: bool,
}

impl NotifyLogEvent {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(&self.category, self.day_of_week, self.hour_bin)
    }
}

/// Canonical record of a task creation, feeding the pattern detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreation {
    pub title: String,
    pub category: String,
    pub due_at: Option<i64>,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// Device context (read-only collaborator input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Wifi,
    Cellular,
    Offline,
}

/// Snapshot of device state at scoring time. Only ever applied as bounded
/// multiplicative adjustments — a missing or absurd context cannot sink a
/// candidate below the score floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    /// Battery level in [0,1].
    pub battery01: f64,
    pub charging: bool,
    pub network: NetworkKind,
    /// Current movement speed, m/s.
    pub speed_mps: f64,
    /// Minutes until the next calendar event, if one is known.
    pub minutes_to_next_event: Option<i64>,
}

// ---------------------------------------------------------------------------
// Produced records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStyle {
    Quiet,
    Normal,
    Loud,
}

/// How the consumer should deliver into this slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub style: ChannelStyle,
    /// Batch into the daily digest instead of an individual push.
    pub digest: bool,
    /// Schedule an early reminder ahead of the due time.
    pub early_reminders: bool,
}

/// Query for the notification-timing optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub category: String,
    pub priority01: f64,
    pub due_at: Option<i64>,
    pub est_duration_ms: Option<i64>,
    pub context: Option<DeviceContext>,
}

/// Ranked recommendation for when to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecommendation {
    pub day_of_week: u8,
    pub bin: u8,
    pub score: f64,
    /// min(1, delivered / (3 · min_samples)).
    pub confidence: f64,
    pub reason: String,
    /// Slot start plus the learned median reaction time, epoch ms.
    pub estimated_open_time: i64,
    pub channel_config: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeOption {
    pub minutes: i64,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusWindow {
    pub category: String,
    pub day_of_week: u8,
    pub start_bin: u8,
    pub end_bin: u8,
    pub p_open_5m: f64,
    pub median_rt_ms: f64,
    pub confidence: f64,
}

/// Overall engagement readout from the global aggregate, for the settings
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementOverview {
    pub p_open_5m: f64,
    pub p_open_30m: f64,
    pub median_rt_ms: f64,
    pub delivered: i64,
    pub opened: i64,
    pub ignored: i64,
}

// ---------------------------------------------------------------------------
// Pattern outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Irregular,
}

impl Cadence {
    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
            Cadence::Monthly => "monthly",
            Cadence::Irregular => "irregular",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "weekly" => Cadence::Weekly,
            "biweekly" => Cadence::Biweekly,
            "monthly" => Cadence::Monthly,
            _ => Cadence::Irregular,
        }
    }
}

/// How the user answered a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserResponse {
    Accepted,
    Dismissed,
    Ignored,
}

impl UserResponse {
    pub fn as_str(self) -> &'static str {
        match self {
            UserResponse::Accepted => "accepted",
            UserResponse::Dismissed => "dismissed",
            UserResponse::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(UserResponse::Accepted),
            "dismissed" => Some(UserResponse::Dismissed),
            "ignored" => Some(UserResponse::Ignored),
            _ => None,
        }
    }
}

/// Learned habitual creation slot for a pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedSlot {
    pub day_of_week: u8,
    pub bin: u8,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    Add,
    AddToday,
    Skip,
    SetRepeat,
}

/// A planned proactive suggestion, handed to the OS-level scheduler by the
/// consumer. This engine only returns data; it never schedules anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionNotification {
    pub id: String,
    pub pattern_key: String,
    pub title: String,
    pub display_title: String,
    pub target_dow: u8,
    pub target_label: String,
    pub rationale: String,
    pub fire_at: i64,
    pub actions: Vec<SuggestionAction>,
}

impl SuggestionNotification {
    /// Local calendar day the suggestion fires on, for per-day capping.
    pub fn fire_day(&self, tz_offset_min: i32) -> i64 {
        util::day_start(self.fire_at, tz_offset_min)
    }
}
