//! Fair value gap detection.
//!
//! Three consecutive candles (a, b, c) leave a bullish gap when `a.high < c.low`
//! and a bearish gap when `a.low > c.high`. Fill status is left to
//! [`mark_consumed`](super::mark_consumed).

use std::collections::HashMap;

use super::helpers::{clamp_strength, relative_move, window_start};
use crate::params::{get_period, get_scalar, ParamMeta, ParameterizedDetector};
use crate::{Direction, PatternDetector, PatternEvent, PatternKind, Period, Result, SignalError, OHLCV};

/// SMC_FVG - three-candle imbalance
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GapDetector {
    /// Trailing candles searched
    pub lookback: Period,
    /// Strength = gap size / a.close × scale
    pub scale: f64,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            scale: 1000.0,
        }
    }
}

impl PatternDetector for GapDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::Gap
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent> {
        let mut events = Vec::new();
        if bars.len() < self.min_bars() {
            return events;
        }

        let max = PatternKind::Gap.max_strength();
        let start = window_start(bars.len(), self.lookback.get());

        for i in (start + 2)..bars.len() {
            let a = &bars[i - 2];
            let c = &bars[i];

            let (direction, top, bottom) = if a.high() < c.low() {
                (Direction::Bullish, c.low(), a.high())
            } else if a.low() > c.high() {
                (Direction::Bearish, a.low(), c.high())
            } else {
                continue;
            };

            events.push(PatternEvent {
                kind: PatternKind::Gap,
                direction,
                break_kind: None,
                start_index: i - 2,
                end_index: i,
                top,
                bottom,
                strength: clamp_strength(relative_move(top - bottom, a.close(), self.scale), max),
                consumed: false,
            });
        }

        events
    }

    fn validate_config(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SignalError::InvalidConfig(format!(
                "gap scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

const GAP_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("lookback", 50.0, (20.0, 200.0, 10.0), "Trailing candles searched"),
    ParamMeta::scalar("scale", 1000.0, (250.0, 2000.0, 250.0), "Strength per unit of relative gap size"),
];

impl ParameterizedDetector for GapDetector {
    fn param_meta() -> &'static [ParamMeta] {
        GAP_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 50)?,
            scale: get_scalar(params, "scale", 1000.0)?,
        })
    }

    fn pattern_name() -> &'static str {
        PatternKind::Gap.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(0, o, h, l, c, 1_000.0)
    }

    #[test]
    fn bullish_gap_bounds() {
        let bars = vec![
            bar(98.0, 100.0, 97.0, 99.0),
            bar(99.0, 108.0, 98.5, 107.0),
            bar(107.0, 109.0, 105.0, 108.0),
        ];
        let events = GapDetector::default().detect(&bars);
        assert_eq!(events.len(), 1);
        let gap = events[0];
        assert_eq!(gap.direction, Direction::Bullish);
        assert_eq!(gap.bottom, 100.0);
        assert_eq!(gap.top, 105.0);
        assert_eq!((gap.start_index, gap.end_index), (0, 2));
        // 5 / 99 × 1000 ≈ 50.5 → clamped
        assert_eq!(gap.strength, 7.0);
        assert!(!gap.consumed);
    }

    #[test]
    fn bearish_gap_strength() {
        let bars = vec![
            bar(1000.0, 1001.0, 1000.0, 1000.0),
            bar(1000.0, 1000.0, 995.0, 996.0),
            bar(996.0, 998.0, 994.0, 995.0),
        ];
        let events = GapDetector::default().detect(&bars);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Bearish);
        assert_eq!(events[0].top, 1000.0);
        assert_eq!(events[0].bottom, 998.0);
        assert!((events[0].strength - 2.0).abs() < 1e-9);
    }

    #[test]
    fn touching_candles_leave_no_gap() {
        let bars = vec![
            bar(98.0, 100.0, 97.0, 99.0),
            bar(99.0, 101.0, 98.0, 100.0),
            bar(100.0, 102.0, 100.0, 101.0),
        ];
        assert!(GapDetector::default().detect(&bars).is_empty());
    }

    #[test]
    fn short_input_is_empty() {
        let bars = vec![bar(1.0, 2.0, 0.5, 1.5); 2];
        assert!(GapDetector::default().detect(&bars).is_empty());
        assert!(GapDetector::default().detect::<Candle>(&[]).is_empty());
    }

    #[test]
    fn lookback_limits_window() {
        let mut bars = vec![
            bar(98.0, 100.0, 97.0, 99.0),
            bar(99.0, 108.0, 98.5, 107.0),
            bar(107.0, 109.0, 105.0, 108.0),
        ];
        bars.extend(std::iter::repeat(bar(108.0, 109.0, 107.0, 108.0)).take(10));
        let detector = GapDetector {
            lookback: Period::new_const(5),
            ..GapDetector::default()
        };
        assert!(detector.detect(&bars).is_empty());
    }

    #[test]
    fn with_params_overrides() {
        let mut params = HashMap::new();
        params.insert("scale", 500.0);
        let detector = GapDetector::with_params(&params).unwrap();
        assert_eq!(detector.scale, 500.0);
        assert_eq!(detector.lookback.get(), 50);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let detector = GapDetector {
            scale: 0.0,
            ..GapDetector::default()
        };
        assert!(detector.validate_config().is_err());
    }
}
