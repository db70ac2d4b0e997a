//! Shared math for the structural detectors and bar-based analyzers.

use crate::{OHLCV, PatternEvent};

/// Clamp a raw strength into [0, max]; NaN collapses to 0.
#[inline]
pub fn clamp_strength(raw: f64, max: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, max)
}

/// `distance / reference × scale`, or 0 when the reference is not a positive price.
#[inline]
pub fn relative_move(distance: f64, reference: f64, scale: f64) -> f64 {
    if reference <= 0.0 {
        return 0.0;
    }
    distance / reference * scale
}

/// First index of the trailing window of `lookback` bars
#[inline]
pub fn window_start(len: usize, lookback: usize) -> usize {
    len.saturating_sub(lookback)
}

/// Average volume over the `period` bars before `at` (exclusive).
/// Returns 0.0 when there is no prior bar.
#[inline]
pub fn trailing_avg_volume<T: OHLCV>(bars: &[T], at: usize, period: usize) -> f64 {
    let at = at.min(bars.len());
    let s = at.saturating_sub(period);
    let slice = &bars[s..at];
    if slice.is_empty() {
        return 0.0;
    }
    slice.iter().map(|b| b.volume()).sum::<f64>() / slice.len() as f64
}

/// (max high, min low) over `bars`, None for an empty slice
pub fn extremes<T: OHLCV>(bars: &[T]) -> Option<(f64, f64)> {
    let first = bars.first()?;
    Some(bars.iter().fold((first.high(), first.low()), |(hi, lo), b| {
        (hi.max(b.high()), lo.min(b.low()))
    }))
}

/// Flag every event that a candle after its `end_index` traded back into.
pub fn mark_consumed<T: OHLCV>(events: &mut [PatternEvent], bars: &[T]) {
    for event in events.iter_mut() {
        let later = bars.get(event.end_index + 1..).unwrap_or(&[]);
        if later.iter().any(|bar| event.is_revisited_by(bar)) {
            event.consumed = true;
        }
    }
}

/// Unconsumed event closest to `price` that passes `filter`.
/// Ties go to the most recent event.
pub fn nearest_active<'a, F>(events: &'a [PatternEvent], price: f64, filter: F) -> Option<&'a PatternEvent>
where
    F: Fn(&PatternEvent) -> bool,
{
    events
        .iter()
        .filter(|e| e.is_active() && filter(e))
        .fold(None, |best: Option<&PatternEvent>, e| match best {
            Some(b) if b.distance_to(price) < e.distance_to(price) => Some(b),
            Some(b) if b.distance_to(price) == e.distance_to(price) && b.end_index > e.end_index => {
                Some(b)
            }
            _ => Some(e),
        })
}

/// Event with the greatest `end_index`, consumed or not
pub fn latest(events: &[PatternEvent]) -> Option<&PatternEvent> {
    events.iter().max_by_key(|e| e.end_index)
}
