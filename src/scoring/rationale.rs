//! Human-readable reasons behind an assessment.

use super::CategoryScore;
use crate::Direction;

/// Sole reason when nothing scored well
pub const LOW_CONFIDENCE: &str = "Low confidence signal - multiple weak indicators";

/// One line per sub-score at or above `notable_fraction` of its maximum, in
/// category then factor order. Falls back to [`LOW_CONFIDENCE`].
pub fn build_rationale(categories: &[CategoryScore], notable_fraction: f64) -> Vec<String> {
    let reasons: Vec<String> = categories
        .iter()
        .flat_map(|c| c.subscores.iter())
        .filter(|s| s.value > 0.0 && s.fraction() >= notable_fraction)
        .map(|s| {
            let lean = match s.signal {
                Direction::Bullish => " bullish",
                Direction::Bearish => " bearish",
                Direction::Neutral => "",
            };
            format!("{} ({:.1}/{:.0}{})", s.factor.label(), s.value, s.max, lean)
        })
        .collect();

    if reasons.is_empty() {
        vec![LOW_CONFIDENCE.to_string()]
    } else {
        reasons
    }
}
