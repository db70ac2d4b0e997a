//! Statistical analyzers: return distribution and price barrier clusters.

use super::{mean, std_dev};
use crate::detectors::{extremes, window_start};
use crate::scoring::{Factor, SubScore};
use crate::{Direction, Period, Ratio, OHLCV};

// ============================================================
// RETURN DISTRIBUTION
// ============================================================

/// Simple close-to-close returns. Pairs with a non-positive prior close are skipped.
pub fn returns<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.windows(2)
        .filter(|w| w[0].close() > 0.0)
        .map(|w| (w[1].close() - w[0].close()) / w[0].close())
        .collect()
}

/// mean ± kσ return bands
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReturnBands {
    pub mean: f64,
    pub std_dev: f64,
    pub one_sigma: (f64, f64),
    pub two_sigma: (f64, f64),
    pub three_sigma: (f64, f64),
}

impl ReturnBands {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        let band = |k: f64| (mean - k * std_dev, mean + k * std_dev);
        Self {
            mean,
            std_dev,
            one_sigma: band(1.0),
            two_sigma: band(2.0),
            three_sigma: band(3.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DistributionReport {
    pub sample_size: usize,
    pub bands: Option<ReturnBands>,
    /// Share of positive returns in percent
    pub up_probability: f64,
    /// Share of negative returns in percent
    pub down_probability: f64,
    /// Latest return in σ units, 0 when flat
    pub last_return_sigma: f64,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReturnDistributionAnalyzer {
    pub lookback: Period,
    /// |mean| beyond this many σ sets the signal
    pub signal_sigma: f64,
    /// Value per unit of |mean / σ|
    pub score_scale: f64,
}

impl Default for ReturnDistributionAnalyzer {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(100),
            signal_sigma: 0.5,
            score_scale: 10.0,
        }
    }
}

impl ReturnDistributionAnalyzer {
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> DistributionReport {
        let window = &bars[window_start(bars.len(), self.lookback.get() + 1)..];
        let rets = returns(window);

        let neutral = DistributionReport {
            sample_size: rets.len(),
            bands: None,
            up_probability: 0.0,
            down_probability: 0.0,
            last_return_sigma: 0.0,
            score: SubScore::neutral(Factor::ReturnDistribution),
        };
        if rets.len() < 2 {
            return neutral;
        }
        let Some(mu) = mean(&rets) else {
            return neutral;
        };
        let sigma = std_dev(&rets, mu);

        let n = rets.len() as f64;
        let up_probability = rets.iter().filter(|r| **r > 0.0).count() as f64 / n * 100.0;
        let down_probability = rets.iter().filter(|r| **r < 0.0).count() as f64 / n * 100.0;

        if sigma <= f64::EPSILON {
            return DistributionReport {
                bands: Some(ReturnBands::new(mu, 0.0)),
                up_probability,
                down_probability,
                ..neutral
            };
        }

        let signal = if mu > sigma * self.signal_sigma {
            Direction::Bullish
        } else if mu < -sigma * self.signal_sigma {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let last_return_sigma = rets.last().map_or(0.0, |r| (r - mu) / sigma);

        DistributionReport {
            bands: Some(ReturnBands::new(mu, sigma)),
            up_probability,
            down_probability,
            last_return_sigma,
            score: SubScore::new(
                Factor::ReturnDistribution,
                (mu / sigma).abs() * self.score_scale,
                signal,
            ),
            ..neutral
        }
    }
}

// ============================================================
// BARRIER CLUSTERS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Barrier {
    pub kind: BarrierKind,
    /// First observation that opened the cluster
    pub price: f64,
    pub touches: usize,
    /// touches / saturation, capped at 1
    pub strength: f64,
}

/// Greedy clustering: each price joins the first existing level within
/// `tolerance` (relative to the level), otherwise opens a new one. Levels with
/// fewer than `min_touches` are dropped; the rest are ordered by touch count,
/// stable on first appearance, and truncated to `max_levels`.
pub fn cluster_levels(
    prices: &[f64],
    tolerance: f64,
    min_touches: usize,
    max_levels: usize,
) -> Vec<(f64, usize)> {
    let mut levels: Vec<(f64, usize)> = Vec::new();
    for &price in prices {
        match levels
            .iter_mut()
            .find(|(level, _)| *level > 0.0 && ((price - *level) / *level).abs() <= tolerance)
        {
            Some((_, count)) => *count += 1,
            None => levels.push((price, 1)),
        }
    }
    levels.retain(|(_, count)| *count >= min_touches);
    levels.sort_by(|a, b| b.1.cmp(&a.1));
    levels.truncate(max_levels);
    levels
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BarrierReport {
    pub barriers: Vec<Barrier>,
    /// Highest support below the close, else close × (1 − fallback)
    pub nearest_support: f64,
    /// Lowest resistance above the close, else close × (1 + fallback)
    pub nearest_resistance: f64,
    pub support_distance: f64,
    pub resistance_distance: f64,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BarrierClusterAnalyzer {
    pub lookback: Period,
    pub tolerance: Ratio,
    pub min_touches: usize,
    /// Levels kept per side
    pub max_levels: usize,
    pub fallback_distance: Ratio,
    /// Touch count at which a level reaches full strength
    pub touch_saturation: usize,
}

impl Default for BarrierClusterAnalyzer {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(100),
            tolerance: Ratio::new_const(0.01),
            min_touches: 2,
            max_levels: 10,
            fallback_distance: Ratio::new_const(0.05),
            touch_saturation: 10,
        }
    }
}

impl BarrierClusterAnalyzer {
    fn side(&self, prices: &[f64], kind: BarrierKind) -> impl Iterator<Item = Barrier> + '_ {
        let saturation = self.touch_saturation.max(1) as f64;
        cluster_levels(prices, self.tolerance.get(), self.min_touches, self.max_levels)
            .into_iter()
            .map(move |(price, touches)| Barrier {
                kind,
                price,
                touches,
                strength: (touches as f64 / saturation).min(1.0),
            })
    }

    /// Highs cluster into resistance, lows into support.
    pub fn barriers<T: OHLCV>(&self, bars: &[T]) -> Vec<Barrier> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();
        self.side(&highs, BarrierKind::Resistance)
            .chain(self.side(&lows, BarrierKind::Support))
            .collect()
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> BarrierReport {
        let window = &bars[window_start(bars.len(), self.lookback.get())..];
        let close = window.last().map_or(0.0, |b| b.close());
        // a flat window is one price, not a barrier
        let flat = extremes(window).map_or(true, |(hi, lo)| hi - lo <= f64::EPSILON);
        let barriers = if flat { Vec::new() } else { self.barriers(window) };
        let fallback = self.fallback_distance.get();

        let nearest_support = barriers
            .iter()
            .filter(|b| b.kind == BarrierKind::Support && b.price < close)
            .map(|b| b.price)
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |q| q.max(p))))
            .unwrap_or(close * (1.0 - fallback));
        let nearest_resistance = barriers
            .iter()
            .filter(|b| b.kind == BarrierKind::Resistance && b.price > close)
            .map(|b| b.price)
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |q| q.min(p))))
            .unwrap_or(close * (1.0 + fallback));

        let (support_distance, resistance_distance) = if close > 0.0 {
            (
                (close - nearest_support) / close,
                (nearest_resistance - close) / close,
            )
        } else {
            (0.0, 0.0)
        };

        let signal = if resistance_distance > support_distance * 2.0 {
            Direction::Bullish
        } else if support_distance > resistance_distance * 2.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let value = if barriers.is_empty() {
            0.0
        } else {
            let avg = barriers.iter().map(|b| b.strength).sum::<f64>() / barriers.len() as f64;
            avg * Factor::Barriers.max()
        };

        tracing::trace!(
            levels = barriers.len(),
            nearest_support,
            nearest_resistance,
            "barrier clusters"
        );

        BarrierReport {
            barriers,
            nearest_support,
            nearest_resistance,
            support_distance,
            resistance_distance,
            score: SubScore::new(Factor::Barriers, value, signal),
        }
    }
}
