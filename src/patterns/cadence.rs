//! Cadence classification: what rhythm does a pattern repeat on?

use std::collections::HashSet;

use crate::db::Occurrence;
use crate::types::Cadence;
use crate::util::weeks_between;

/// Fraction of gaps that must fit the rhythm for biweekly/monthly.
const GAP_QUORUM: f64 = 0.66;

/// Classify the repeat rhythm from the occurrence ring (oldest first).
///
/// Checks tighten from weekly outward: weekly needs the last three
/// occurrences in three distinct ISO weeks with ~1-week gaps; biweekly
/// tolerates more jitter over the last six; monthly looks at the last four.
pub fn classify(occurrences: &[Occurrence]) -> Cadence {
    if occurrences.len() < 3 {
        return Cadence::Irregular;
    }

    // Weekly: last 3, distinct ISO weeks, each gap within 0.3 of one week
    let last3 = &occurrences[occurrences.len() - 3..];
    let weeks: HashSet<&str> = last3.iter().map(|o| o.year_week.as_str()).collect();
    if weeks.len() == 3 && gaps_weeks(last3).iter().all(|g| (g - 1.0).abs() <= 0.3) {
        return Cadence::Weekly;
    }

    // Biweekly: last 6, at least 66% of gaps within 0.5 of two weeks
    let last6 = &occurrences[occurrences.len().saturating_sub(6)..];
    let gaps = gaps_weeks(last6);
    if !gaps.is_empty() && quorum(&gaps, |g| (g - 2.0).abs() <= 0.5) {
        return Cadence::Biweekly;
    }

    // Monthly: last 4, at least 66% of gaps in [3.5, 5] weeks
    let last4 = &occurrences[occurrences.len().saturating_sub(4)..];
    let gaps = gaps_weeks(last4);
    if !gaps.is_empty() && quorum(&gaps, |g| (3.5..=5.0).contains(g)) {
        return Cadence::Monthly;
    }

    Cadence::Irregular
}

fn gaps_weeks(occurrences: &[Occurrence]) -> Vec<f64> {
    occurrences
        .windows(2)
        .map(|pair| weeks_between(pair[0].created_at, pair[1].created_at))
        .collect()
}

fn quorum(gaps: &[f64], fits: impl Fn(&f64) -> bool) -> bool {
    let hits = gaps.iter().filter(|g| fits(g)).count();
    hits as f64 / gaps.len() as f64 >= GAP_QUORUM
}
