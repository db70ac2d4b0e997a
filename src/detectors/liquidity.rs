//! Liquidity sweep detection.
//!
//! A candle that trades above the highest high of the preceding window takes
//! out buy-side liquidity and is tagged bearish; a candle below the lowest low
//! takes sell-side liquidity and is tagged bullish. Reversal after a sweep is a
//! trading heuristic, not a measured edge.

use std::collections::HashMap;

use super::helpers::{clamp_strength, extremes, relative_move, window_start};
use crate::params::{get_period, get_scalar, ParamMeta, ParameterizedDetector};
use crate::{Direction, PatternDetector, PatternEvent, PatternKind, Period, Result, SignalError, OHLCV};

/// Which side's resting orders were taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepSide {
    BuySide,
    SellSide,
}

impl PatternEvent {
    /// Side of a liquidity sweep, None for other kinds
    pub fn sweep_side(&self) -> Option<SweepSide> {
        match (self.kind, self.direction) {
            (PatternKind::LiquiditySweep, Direction::Bearish) => Some(SweepSide::BuySide),
            (PatternKind::LiquiditySweep, Direction::Bullish) => Some(SweepSide::SellSide),
            _ => None,
        }
    }
}

/// SMC_LIQUIDITY_SWEEP
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LiquiditySweepDetector {
    pub lookback: Period,
    /// Rolling window whose extremes define resting liquidity
    pub window: Period,
    /// Strength = breach beyond the level / level × scale
    pub scale: f64,
}

impl Default for LiquiditySweepDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(100),
            window: Period::new_const(20),
            scale: 1000.0,
        }
    }
}

impl LiquiditySweepDetector {
    fn sweep(&self, index: usize, level: f64, breach: f64, direction: Direction) -> PatternEvent {
        let max = PatternKind::LiquiditySweep.max_strength();
        PatternEvent {
            kind: PatternKind::LiquiditySweep,
            direction,
            break_kind: None,
            start_index: index,
            end_index: index,
            top: level,
            bottom: level,
            strength: clamp_strength(relative_move(breach, level, self.scale), max),
            consumed: false,
        }
    }
}

impl PatternDetector for LiquiditySweepDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::LiquiditySweep
    }

    fn min_bars(&self) -> usize {
        self.window.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent> {
        let mut events = Vec::new();
        if bars.len() < self.min_bars() {
            return events;
        }

        let w = self.window.get();
        let start = window_start(bars.len(), self.lookback.get());

        for i in (start + w)..bars.len() {
            let Some((max_high, min_low)) = extremes(&bars[i - w..i]) else {
                continue;
            };
            let bar = &bars[i];

            if bar.high() > max_high {
                events.push(self.sweep(i, max_high, bar.high() - max_high, Direction::Bearish));
            }
            if bar.low() < min_low {
                events.push(self.sweep(i, min_low, min_low - bar.low(), Direction::Bullish));
            }
        }

        events
    }

    fn validate_config(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SignalError::InvalidConfig(format!(
                "liquidity scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

const LIQUIDITY_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("lookback", 100.0, (20.0, 300.0, 20.0), "Trailing candles searched"),
    ParamMeta::period("window", 20.0, (5.0, 50.0, 5.0), "Rolling window for resting liquidity"),
    ParamMeta::scalar("scale", 1000.0, (250.0, 2000.0, 250.0), "Strength per unit of relative breach"),
];

impl ParameterizedDetector for LiquiditySweepDetector {
    fn param_meta() -> &'static [ParamMeta] {
        LIQUIDITY_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 100)?,
            window: get_period(params, "window", 20)?,
            scale: get_scalar(params, "scale", 1000.0)?,
        })
    }

    fn pattern_name() -> &'static str {
        PatternKind::LiquiditySweep.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn range_bars(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(i as i64, 100.0, 101.0, 99.0, 100.0, 1.0))
            .collect()
    }

    fn detector() -> LiquiditySweepDetector {
        LiquiditySweepDetector {
            window: Period::new_const(5),
            ..LiquiditySweepDetector::default()
        }
    }

    #[test]
    fn buy_side_sweep_is_bearish() {
        let mut bars = range_bars(5);
        bars.push(Candle::new(5, 100.0, 101.5, 99.5, 100.2, 1.0));
        let events = detector().detect(&bars);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Bearish);
        assert_eq!(events[0].sweep_side(), Some(SweepSide::BuySide));
        assert_eq!(events[0].top, 101.0);
        // 0.5 / 101 × 1000 ≈ 4.95
        assert!((events[0].strength - 500.0 / 101.0).abs() < 1e-9);
    }

    #[test]
    fn sell_side_sweep_is_bullish() {
        let mut bars = range_bars(5);
        bars.push(Candle::new(5, 100.0, 100.5, 95.0, 99.8, 1.0));
        let events = detector().detect(&bars);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sweep_side(), Some(SweepSide::SellSide));
        assert_eq!(events[0].strength, 5.0);
    }

    #[test]
    fn inside_bar_is_not_a_sweep() {
        let bars = range_bars(10);
        assert!(detector().detect(&bars).is_empty());
    }

    #[test]
    fn window_not_filled_is_empty() {
        let bars = range_bars(5);
        assert!(detector().detect(&bars).is_empty());
    }
}
