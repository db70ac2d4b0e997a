//! Order-flow delta estimated from candle direction.

use crate::detectors::window_start;
use crate::scoring::{Factor, SubScore};
use crate::state::RingBuffer;
use crate::{Direction, OHLCVExt, Period, Ratio, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BarDelta {
    pub index: usize,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub delta: f64,
    /// Running sum from the window start
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderFlowReport {
    pub deltas: Vec<BarDelta>,
    pub current_delta: f64,
    pub cumulative_delta: f64,
    /// Mean of the trailing per-evaluation delta history
    pub delta_average: f64,
    /// Buy share of window volume in percent, 50 without volume
    pub buy_pressure: f64,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrderFlowAnalyzer {
    pub lookback: Period,
    /// Share of volume attributed to buyers on an up candle
    pub buy_share: Ratio,
    /// Cumulative delta beyond this many mean |delta| gives a signal
    pub signal_multiple: f64,
    /// Value per unit of |cumulative| / mean |delta|
    pub score_scale: f64,
}

impl Default for OrderFlowAnalyzer {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            buy_share: Ratio::new_const(0.65),
            signal_multiple: 2.0,
            score_scale: 0.8,
        }
    }
}

impl OrderFlowAnalyzer {
    /// Up candles split volume `buy_share` to buyers, down candles the
    /// reverse, unchanged candles half and half.
    pub fn split<T: OHLCV>(&self, bar: &T) -> (f64, f64) {
        let volume = bar.volume().max(0.0);
        let share = if bar.is_bullish() {
            self.buy_share.get()
        } else if bar.is_bearish() {
            1.0 - self.buy_share.get()
        } else {
            0.5
        };
        (volume * share, volume * (1.0 - share))
    }

    /// Pushes the latest bar's delta into `history` when there is at least one bar.
    pub fn analyze<T: OHLCV>(&self, bars: &[T], history: &mut RingBuffer) -> OrderFlowReport {
        let start = window_start(bars.len(), self.lookback.get());
        let mut cumulative = 0.0;
        let deltas: Vec<BarDelta> = bars[start..]
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let (buy_volume, sell_volume) = self.split(bar);
                let delta = buy_volume - sell_volume;
                cumulative += delta;
                BarDelta {
                    index: start + i,
                    buy_volume,
                    sell_volume,
                    delta,
                    cumulative,
                }
            })
            .collect();

        let current_delta = deltas.last().map_or(0.0, |d| d.delta);
        if !deltas.is_empty() {
            history.push(current_delta);
        }
        let delta_average = history.mean().unwrap_or(0.0);

        let total_buy: f64 = deltas.iter().map(|d| d.buy_volume).sum();
        let total_volume: f64 = deltas.iter().map(|d| d.buy_volume + d.sell_volume).sum();
        let buy_pressure = if total_volume > 0.0 {
            total_buy / total_volume * 100.0
        } else {
            50.0
        };

        let mean_abs = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.delta.abs()).sum::<f64>() / deltas.len() as f64
        };

        let (value, signal) = if mean_abs > 0.0 {
            let threshold = self.signal_multiple * mean_abs;
            let signal = if cumulative > threshold {
                Direction::Bullish
            } else if cumulative < -threshold {
                Direction::Bearish
            } else {
                Direction::Neutral
            };
            (cumulative.abs() / mean_abs * self.score_scale, signal)
        } else {
            (0.0, Direction::Neutral)
        };

        OrderFlowReport {
            current_delta,
            cumulative_delta: cumulative,
            delta_average,
            buy_pressure,
            score: SubScore::new(Factor::Delta, value, signal),
            deltas,
        }
    }
}
