//! Order block (consolidation break) detection.

use std::collections::HashMap;

use super::helpers::{clamp_strength, window_start};
use crate::params::{get_period, get_ratio, get_scalar, ParamMeta, ParameterizedDetector};
use crate::{
    Direction, PatternDetector, PatternEvent, PatternKind, Period, Ratio, Result, SignalError,
    OHLCV,
};

/// SMC_ORDER_BLOCK - the last candle before a strong breakout.
///
/// The block spans that candle's high/low. `start_index` is the block candle,
/// `end_index` the breakout candle, so a retest is only counted after the
/// breakout has closed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrderBlockDetector {
    pub lookback: Period,
    /// Minimum close-to-close move of the breakout candle
    pub breakout_threshold: Ratio,
    /// Strength = breakout volume / volume_divisor
    pub volume_divisor: f64,
}

impl Default for OrderBlockDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(100),
            breakout_threshold: Ratio::new_const(0.02),
            volume_divisor: 1_000_000.0,
        }
    }
}

impl PatternDetector for OrderBlockDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::ConsolidationBreak
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent> {
        let mut events = Vec::new();
        if bars.len() < self.min_bars() {
            return events;
        }

        let threshold = self.breakout_threshold.get();
        let max = PatternKind::ConsolidationBreak.max_strength();
        let start = window_start(bars.len(), self.lookback.get());

        for i in (start + 1)..bars.len() {
            let block = &bars[i - 1];
            let breakout = &bars[i];

            let direction = if breakout.close() > block.close() * (1.0 + threshold) {
                Direction::Bullish
            } else if breakout.close() < block.close() * (1.0 - threshold) {
                Direction::Bearish
            } else {
                continue;
            };

            events.push(PatternEvent {
                kind: PatternKind::ConsolidationBreak,
                direction,
                break_kind: None,
                start_index: i - 1,
                end_index: i,
                top: block.high(),
                bottom: block.low(),
                strength: clamp_strength(breakout.volume() / self.volume_divisor, max),
                consumed: false,
            });
        }

        events
    }

    fn validate_config(&self) -> Result<()> {
        if !self.volume_divisor.is_finite() || self.volume_divisor <= 0.0 {
            return Err(SignalError::InvalidConfig(format!(
                "order block volume_divisor must be finite and > 0, got {}",
                self.volume_divisor
            )));
        }
        Ok(())
    }
}

const ORDER_BLOCK_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("lookback", 100.0, (20.0, 300.0, 20.0), "Trailing candles searched"),
    ParamMeta::ratio(
        "breakout_threshold",
        0.02,
        (0.005, 0.05, 0.005),
        "Minimum breakout move relative to the block close",
    ),
    ParamMeta::scalar(
        "volume_divisor",
        1_000_000.0,
        (100_000.0, 5_000_000.0, 100_000.0),
        "Breakout volume that maps to one strength point",
    ),
];

impl ParameterizedDetector for OrderBlockDetector {
    fn param_meta() -> &'static [ParamMeta] {
        ORDER_BLOCK_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 100)?,
            breakout_threshold: get_ratio(params, "breakout_threshold", 0.02)?,
            volume_divisor: get_scalar(params, "volume_divisor", 1_000_000.0)?,
        })
    }

    fn pattern_name() -> &'static str {
        PatternKind::ConsolidationBreak.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    #[test]
    fn bullish_block_from_breakout() {
        let bars = vec![
            Candle::new(0, 98.0, 100.0, 97.0, 99.0, 100_000.0),
            Candle::new(1, 99.0, 108.0, 98.5, 107.0, 2_000_000.0),
        ];
        let events = OrderBlockDetector::default().detect(&bars);
        assert_eq!(events.len(), 1);
        let block = events[0];
        assert_eq!(block.direction, Direction::Bullish);
        assert_eq!((block.bottom, block.top), (97.0, 100.0));
        assert_eq!((block.start_index, block.end_index), (0, 1));
        assert!((block.strength - 2.0).abs() < 1e-12);
    }

    #[test]
    fn bearish_block_from_breakdown() {
        let bars = vec![
            Candle::new(0, 100.0, 101.0, 99.0, 100.0, 10.0),
            Candle::new(1, 100.0, 100.0, 95.0, 96.0, 9_000_000.0),
        ];
        let events = OrderBlockDetector::default().detect(&bars);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Bearish);
        assert_eq!(events[0].strength, 7.0);
    }

    #[test]
    fn small_move_is_ignored() {
        let bars = vec![
            Candle::new(0, 100.0, 101.0, 99.0, 100.0, 10.0),
            Candle::new(1, 100.0, 102.5, 99.5, 101.9, 10.0),
        ];
        assert!(OrderBlockDetector::default().detect(&bars).is_empty());
    }

    #[test]
    fn single_bar_is_empty() {
        let bars = vec![Candle::new(0, 100.0, 101.0, 99.0, 100.0, 10.0)];
        assert!(OrderBlockDetector::default().detect(&bars).is_empty());
    }
}
