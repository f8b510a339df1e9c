//! Time-bin and calendar helpers (pure math, no DB).
//!
//! All engine timestamps are milliseconds since the Unix epoch. Day-of-week
//! and bin derivation apply the configured timezone offset so tests stay
//! deterministic regardless of the host timezone.

use chrono::{DateTime, Datelike};

/// Milliseconds per 30-minute bin.
pub const BIN_MS: i64 = 30 * 60 * 1000;
/// Bins per day (0..48).
pub const BINS_PER_DAY: u8 = 48;
pub const MS_PER_MIN: i64 = 60 * 1000;
pub const MS_PER_DAY: i64 = 86_400_000;
pub const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Shift an epoch timestamp into local wall-clock milliseconds.
fn to_local(ms: i64, tz_offset_min: i32) -> i64 {
    ms + tz_offset_min as i64 * MS_PER_MIN
}

/// Day of week for a timestamp: 0=Sunday .. 6=Saturday.
pub fn day_of_week(ms: i64, tz_offset_min: i32) -> u8 {
    DateTime::from_timestamp_millis(to_local(ms, tz_offset_min))
        .map(|d| d.weekday().num_days_from_sunday() as u8)
        .unwrap_or(0)
}

/// 30-minute bin of day for a timestamp: 0..47.
pub fn bin_of_day(ms: i64, tz_offset_min: i32) -> u8 {
    let local = to_local(ms, tz_offset_min);
    let in_day = ((local % MS_PER_DAY) + MS_PER_DAY) % MS_PER_DAY;
    (in_day / BIN_MS) as u8
}

/// ISO year-week key, e.g. `2026-W32`.
pub fn year_week(ms: i64, tz_offset_min: i32) -> String {
    DateTime::from_timestamp_millis(to_local(ms, tz_offset_min))
        .map(|d| d.format("%G-W%V").to_string())
        .unwrap_or_default()
}

/// Epoch ms of the first bin boundary strictly after `now`.
pub fn next_bin_start(now_ms: i64, tz_offset_min: i32) -> i64 {
    let local = to_local(now_ms, tz_offset_min);
    let next = (local.div_euclid(BIN_MS) + 1) * BIN_MS;
    next - tz_offset_min as i64 * MS_PER_MIN
}

/// Epoch ms of local midnight for the day containing `ms`.
pub fn day_start(ms: i64, tz_offset_min: i32) -> i64 {
    let local = to_local(ms, tz_offset_min);
    local.div_euclid(MS_PER_DAY) * MS_PER_DAY - tz_offset_min as i64 * MS_PER_MIN
}

/// Fractional weeks between two timestamps (`b` after `a` is positive).
pub fn weeks_between(a_ms: i64, b_ms: i64) -> f64 {
    (b_ms - a_ms) as f64 / MS_PER_WEEK as f64
}

/// Human day name for a 0=Sunday dow.
pub fn day_name(dow: u8) -> &'static str {
    DAY_NAMES[(dow % 7) as usize]
}

/// `"09:30"`-style label for a bin.
pub fn bin_label(bin: u8) -> String {
    format!("{:02}:{:02}", bin / 2, (bin % 2) * 30)
}
