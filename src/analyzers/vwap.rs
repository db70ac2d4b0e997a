//! Volume-weighted average price with standard-deviation bands.
//!
//! VWAP is `Σ(typical × volume) / Σvolume` from the anchor bar. The deviation
//! is the spread of typical prices around the running VWAP,
//! `sqrt(var(tp) + (mean(tp) − vwap)²)`, with `var(tp)` kept by Welford's
//! update so both stay O(1) per bar without cancelling at large prices.

use crate::scoring::{Factor, SubScore};
use crate::{Direction, OHLCVExt, Period, OHLCV};

/// One bar's VWAP reading
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VwapPoint {
    pub index: usize,
    pub vwap: f64,
    pub std_dev: f64,
    pub upper_1: f64,
    pub lower_1: f64,
    pub upper_2: f64,
    pub lower_2: f64,
}

/// Running VWAP state
#[derive(Debug, Clone, Default)]
pub struct VwapAccumulator {
    cum_pv: f64,
    cum_volume: f64,
    mean_tp: f64,
    /// Sum of squared deviations from `mean_tp`
    m2: f64,
    count: usize,
}

impl VwapAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one bar in. With no volume yet, VWAP is the bar's typical price.
    pub fn push<T: OHLCV>(&mut self, index: usize, bar: &T) -> VwapPoint {
        let tp = bar.typical_price();
        let volume = bar.volume().max(0.0);

        self.cum_pv += tp * volume;
        self.cum_volume += volume;
        self.count += 1;
        let delta = tp - self.mean_tp;
        self.mean_tp += delta / self.count as f64;
        self.m2 += delta * (tp - self.mean_tp);

        let vwap = if self.cum_volume > 0.0 {
            self.cum_pv / self.cum_volume
        } else {
            tp
        };

        let offset = self.mean_tp - vwap;
        let var = self.m2 / self.count as f64 + offset * offset;
        let std_dev = if self.cum_volume > 0.0 { var.max(0.0).sqrt() } else { 0.0 };

        VwapPoint {
            index,
            vwap,
            std_dev,
            upper_1: vwap + std_dev,
            lower_1: vwap - std_dev,
            upper_2: vwap + 2.0 * std_dev,
            lower_2: vwap - 2.0 * std_dev,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VwapReport {
    pub series: Vec<VwapPoint>,
    pub anchor_index: usize,
    pub close: f64,
    /// (close − vwap) / std_dev, 0 when the bands are flat
    pub deviation_sigma: f64,
    /// (close − vwap) / vwap × 100, 0 when vwap is 0
    pub distance_pct: f64,
    pub score: SubScore,
}

impl VwapReport {
    pub fn latest(&self) -> Option<&VwapPoint> {
        self.series.last()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VwapAnalyzer {
    /// Anchor this many bars before the end; None anchors at the first bar
    pub anchor_bars: Option<Period>,
    /// Value per sigma of stretch
    pub sigma_weight: f64,
}

impl Default for VwapAnalyzer {
    fn default() -> Self {
        Self {
            anchor_bars: None,
            sigma_weight: 2.0,
        }
    }
}

impl VwapAnalyzer {
    pub fn series<T: OHLCV>(&self, bars: &[T]) -> (usize, Vec<VwapPoint>) {
        let anchor = self
            .anchor_bars
            .map_or(0, |n| bars.len().saturating_sub(n.get()));
        let mut acc = VwapAccumulator::new();
        let series = bars[anchor..]
            .iter()
            .enumerate()
            .map(|(i, bar)| acc.push(anchor + i, bar))
            .collect();
        (anchor, series)
    }

    /// Value grows with the close's stretch from VWAP; a close outside the 1σ
    /// band leans in its direction.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> VwapReport {
        let (anchor_index, series) = self.series(bars);
        let (Some(point), Some(last)) = (series.last().copied(), bars.last()) else {
            return VwapReport {
                series,
                anchor_index,
                close: 0.0,
                deviation_sigma: 0.0,
                distance_pct: 0.0,
                score: SubScore::neutral(Factor::Vwap),
            };
        };

        let close = last.close();
        let flat = point.std_dev <= f64::EPSILON;
        let deviation_sigma = if flat { 0.0 } else { (close - point.vwap) / point.std_dev };
        let distance_pct = if point.vwap != 0.0 {
            (close - point.vwap) / point.vwap * 100.0
        } else {
            0.0
        };

        let signal = if flat {
            Direction::Neutral
        } else if close > point.upper_1 {
            Direction::Bullish
        } else if close < point.lower_1 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        VwapReport {
            series,
            anchor_index,
            close,
            deviation_sigma,
            distance_pct,
            score: SubScore::new(Factor::Vwap, deviation_sigma.abs() * self.sigma_weight, signal),
        }
    }
}
