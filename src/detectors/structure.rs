//! Break of Structure / Change of Character detection.
//!
//! A swing high is a bar whose high is strictly above the `swing_strength`
//! neighbours on both sides; swing lows mirror that. Each swing is compared with
//! the previous swing of the same type:
//!
//! | comparison  | event        |
//! |-------------|--------------|
//! | higher high | BOS bullish  |
//! | lower low   | BOS bearish  |
//! | lower high  | CHoCH bearish|
//! | higher low  | CHoCH bullish|
//!
//! Equal swings produce nothing.

use std::collections::HashMap;

use super::helpers::{clamp_strength, relative_move, window_start};
use crate::params::{get_period, get_scalar, ParamMeta, ParameterizedDetector};
use crate::{
    BreakKind, Direction, PatternDetector, PatternEvent, PatternKind, Period, Result, SignalError,
    OHLCV,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum SwingType {
    High,
    Low,
}

#[derive(Debug, Clone, Copy)]
struct Swing {
    index: usize,
    price: f64,
}

/// SMC_STRUCTURE_BREAK
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StructureDetector {
    pub lookback: Period,
    /// Neighbours required on each side of a swing
    pub swing_strength: Period,
    /// Strength = percentage distance between swings × scale
    pub scale: f64,
}

impl Default for StructureDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            swing_strength: Period::new_const(2),
            scale: 1.0,
        }
    }
}

impl StructureDetector {
    fn is_swing<T: OHLCV>(&self, bars: &[T], i: usize, ty: SwingType) -> bool {
        let n = self.swing_strength.get();
        (1..=n).all(|j| match ty {
            SwingType::High => bars[i].high() > bars[i - j].high() && bars[i].high() > bars[i + j].high(),
            SwingType::Low => bars[i].low() < bars[i - j].low() && bars[i].low() < bars[i + j].low(),
        })
    }

    fn event(&self, prev: Swing, cur: Swing, direction: Direction, kind: BreakKind) -> PatternEvent {
        let max = PatternKind::StructureBreak.max_strength();
        let pct = relative_move((cur.price - prev.price).abs(), prev.price, 100.0);
        PatternEvent {
            kind: PatternKind::StructureBreak,
            direction,
            break_kind: Some(kind),
            start_index: prev.index,
            end_index: cur.index,
            top: cur.price,
            bottom: cur.price,
            strength: clamp_strength(pct * self.scale, max),
            consumed: false,
        }
    }
}

impl PatternDetector for StructureDetector {
    fn kind(&self) -> PatternKind {
        PatternKind::StructureBreak
    }

    fn min_bars(&self) -> usize {
        2 * self.swing_strength.get() + 1
    }

    fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent> {
        let mut events = Vec::new();
        let n = self.swing_strength.get();
        if bars.len() < self.min_bars() {
            return events;
        }

        let start = window_start(bars.len(), self.lookback.get());
        let mut last_high: Option<Swing> = None;
        let mut last_low: Option<Swing> = None;

        for i in (start + n)..(bars.len() - n) {
            if self.is_swing(bars, i, SwingType::High) {
                let cur = Swing { index: i, price: bars[i].high() };
                if let Some(prev) = last_high {
                    if cur.price > prev.price {
                        events.push(self.event(prev, cur, Direction::Bullish, BreakKind::Bos));
                    } else if cur.price < prev.price {
                        events.push(self.event(prev, cur, Direction::Bearish, BreakKind::Choch));
                    }
                }
                last_high = Some(cur);
            }

            if self.is_swing(bars, i, SwingType::Low) {
                let cur = Swing { index: i, price: bars[i].low() };
                if let Some(prev) = last_low {
                    if cur.price < prev.price {
                        events.push(self.event(prev, cur, Direction::Bearish, BreakKind::Bos));
                    } else if cur.price > prev.price {
                        events.push(self.event(prev, cur, Direction::Bullish, BreakKind::Choch));
                    }
                }
                last_low = Some(cur);
            }
        }

        events
    }

    fn validate_config(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SignalError::InvalidConfig(format!(
                "structure scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

const STRUCTURE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("lookback", 50.0, (20.0, 200.0, 10.0), "Trailing candles searched"),
    ParamMeta::period("swing_strength", 2.0, (1.0, 5.0, 1.0), "Neighbours on each side of a swing"),
    ParamMeta::scalar("scale", 1.0, (0.5, 5.0, 0.5), "Strength per percent between swings"),
];

impl ParameterizedDetector for StructureDetector {
    fn param_meta() -> &'static [ParamMeta] {
        STRUCTURE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 50)?,
            swing_strength: get_period(params, "swing_strength", 2)?,
            scale: get_scalar(params, "scale", 1.0)?,
        })
    }

    fn pattern_name() -> &'static str {
        PatternKind::StructureBreak.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    /// Bars whose highs follow `highs`, lows sit 2 below
    fn from_highs(highs: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Candle::new(i as i64, h - 1.0, h, h - 2.0, h - 0.5, 1.0))
            .collect()
    }

    #[test]
    fn higher_high_is_bullish_bos() {
        let bars = from_highs(&[100.0, 101.0, 105.0, 101.0, 100.0, 102.0, 108.0, 102.0, 101.0]);
        let events = StructureDetector::default().detect(&bars);
        let highs: Vec<_> = events.iter().filter(|e| e.top == 108.0).collect();
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].direction, Direction::Bullish);
        assert_eq!(highs[0].break_kind, Some(BreakKind::Bos));
        assert_eq!((highs[0].start_index, highs[0].end_index), (2, 6));
        // (108 - 105) / 105 × 100 ≈ 2.86
        assert!((highs[0].strength - 300.0 / 105.0).abs() < 1e-9);
    }

    #[test]
    fn lower_high_is_bearish_choch() {
        let bars = from_highs(&[100.0, 101.0, 108.0, 101.0, 100.0, 102.0, 105.0, 102.0, 101.0]);
        let events = StructureDetector::default().detect(&bars);
        let lower: Vec<_> = events.iter().filter(|e| e.top == 105.0).collect();
        assert_eq!(lower.len(), 1);
        assert_eq!(lower[0].direction, Direction::Bearish);
        assert_eq!(lower[0].break_kind, Some(BreakKind::Choch));
    }

    #[test]
    fn higher_low_is_bullish_choch() {
        let lows = [110.0, 108.0, 100.0, 108.0, 109.0, 106.0, 103.0, 106.0, 108.0];
        let bars: Vec<Candle> = lows
            .iter()
            .enumerate()
            .map(|(i, &l)| Candle::new(i as i64, l + 1.0, l + 2.0, l, l + 1.5, 1.0))
            .collect();
        let events = StructureDetector::default().detect(&bars);
        let swing_lows: Vec<_> = events.iter().filter(|e| e.top == 103.0).collect();
        assert_eq!(swing_lows.len(), 1);
        assert_eq!(swing_lows[0].direction, Direction::Bullish);
        assert_eq!(swing_lows[0].break_kind, Some(BreakKind::Choch));
    }

    #[test]
    fn equal_swings_emit_nothing() {
        let bars = from_highs(&[100.0, 101.0, 105.0, 101.0, 100.0, 101.0, 105.0, 101.0, 100.0]);
        let events = StructureDetector::default().detect(&bars);
        assert!(events.iter().all(|e| e.top != 105.0));
    }

    #[test]
    fn short_input_is_empty() {
        let bars = from_highs(&[100.0, 101.0, 102.0, 101.0]);
        assert!(StructureDetector::default().detect(&bars).is_empty());
    }
}
