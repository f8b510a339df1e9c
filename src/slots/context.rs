//! Bounded score modifiers: device context and the deterministic tie-break
//! perturbation.
//!
//! Context only ever nudges a candidate — every factor is clamped to
//! [0.85, 1.15] and the combined multiplier to [0.6, 1.4] — so a malformed
//! context vector can never zero out or explode a score.

use sha2::{Digest, Sha256};

use crate::types::{DeviceContext, NetworkKind};

const FACTOR_MIN: f64 = 0.85;
const FACTOR_MAX: f64 = 1.15;
const COMBINED_MIN: f64 = 0.6;
const COMBINED_MAX: f64 = 1.4;

/// Combined context multiplier. No context means no adjustment.
pub fn context_modifier(ctx: Option<&DeviceContext>) -> f64 {
    let Some(ctx) = ctx else {
        return 1.0;
    };

    // Low battery without a charger suppresses engagement; charging frees it
    let battery = if ctx.charging {
        1.05
    } else if ctx.battery01.is_finite() && ctx.battery01 < 0.15 {
        0.85
    } else {
        1.0
    };

    let network = match ctx.network {
        NetworkKind::Wifi => 1.05,
        NetworkKind::Cellular => 1.0,
        NetworkKind::Offline => 0.9,
    };

    // Fast movement (driving, transit) suppresses; a slow walk slightly
    let movement = if !ctx.speed_mps.is_finite() {
        1.0
    } else if ctx.speed_mps > 8.0 {
        0.85
    } else if ctx.speed_mps > 2.0 {
        0.95
    } else {
        1.0
    };

    // Right before a calendar event the user won't react; a clear gap helps
    let calendar = match ctx.minutes_to_next_event {
        Some(m) if m <= 15 => 0.85,
        Some(m) if m >= 120 => 1.1,
        _ => 1.0,
    };

    let combined = clamp_factor(battery)
        * clamp_factor(network)
        * clamp_factor(movement)
        * clamp_factor(calendar);
    combined.clamp(COMBINED_MIN, COMBINED_MAX)
}

fn clamp_factor(f: f64) -> f64 {
    if f.is_finite() {
        f.clamp(FACTOR_MIN, FACTOR_MAX)
    } else {
        1.0
    }
}

/// Deterministic per-slot perturbation in [0.98, 1.02].
///
/// Replaces the legacy hash-driven "hyperparameter boost": a stable
/// tie-breaker that spreads otherwise-identical candidates without carrying
/// any statistical meaning.
pub fn perturbation(category: &str, day_of_week: u8, bin: u8) -> f64 {
    let digest = hex::encode(Sha256::digest(
        format!("{}:{}:{}", category, day_of_week, bin).as_bytes(),
    ));
    let x = u64::from_str_radix(&digest[..16], 16).unwrap_or(0);
    let unit = x as f64 / u64::MAX as f64;
    0.98 + 0.04 * unit
}
