//! Volume-at-price profile: point of control and value area.

use crate::detectors::window_start;
use crate::scoring::{Factor, SubScore};
use crate::{Direction, OHLCVExt, Period, Ratio, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBin {
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

impl PriceBin {
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeProfile {
    pub bins: Vec<PriceBin>,
    pub poc_index: usize,
    /// Midpoint of the point-of-control bin
    pub poc: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,
    pub total_volume: f64,
    /// Share of total volume inside the value area, 0 when there is no volume
    pub value_area_share: f64,
}

impl VolumeProfile {
    /// Bin `(price, volume)` observations into `bins` equal-width buckets.
    ///
    /// A zero price range collapses to one bin. The value area is the
    /// smallest set of bins, taken by descending volume, whose share first
    /// reaches `value_area`. None for empty input.
    pub fn from_points(points: &[(f64, f64)], bins: usize, value_area: f64) -> Option<Self> {
        let points: Vec<(f64, f64)> = points
            .iter()
            .filter(|(p, v)| p.is_finite() && v.is_finite())
            .map(|&(p, v)| (p, v.max(0.0)))
            .collect();
        let (&(first, _), rest) = points.split_first()?;
        let (lo, hi) = rest
            .iter()
            .fold((first, first), |(lo, hi), &(p, _)| (lo.min(p), hi.max(p)));

        let n = if hi - lo <= f64::EPSILON { 1 } else { bins.max(1) };
        let width = (hi - lo) / n as f64;

        let mut bins: Vec<PriceBin> = (0..n)
            .map(|i| PriceBin {
                low: lo + width * i as f64,
                high: if i + 1 == n { hi } else { lo + width * (i + 1) as f64 },
                volume: 0.0,
            })
            .collect();

        for &(price, volume) in &points {
            let idx = if n == 1 {
                0
            } else {
                (((price - lo) / width).floor() as usize).min(n - 1)
            };
            bins[idx].volume += volume;
        }

        let total_volume: f64 = bins.iter().map(|b| b.volume).sum();
        let poc_index = bins
            .iter()
            .enumerate()
            .fold(0, |best, (i, b)| if b.volume > bins[best].volume { i } else { best });

        // descending volume, ties by price order; poc is first
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| bins[b].volume.total_cmp(&bins[a].volume));

        let mut area = vec![poc_index];
        let mut cum = bins[poc_index].volume;
        if total_volume > 0.0 {
            for &i in order.iter().filter(|&&i| i != poc_index) {
                if cum / total_volume >= value_area {
                    break;
                }
                cum += bins[i].volume;
                area.push(i);
            }
        }

        let value_area_high = area.iter().map(|&i| bins[i].high).fold(f64::MIN, f64::max);
        let value_area_low = area.iter().map(|&i| bins[i].low).fold(f64::MAX, f64::min);
        let value_area_share = if total_volume > 0.0 { cum / total_volume } else { 0.0 };

        Some(Self {
            poc: bins[poc_index].mid(),
            bins,
            poc_index,
            value_area_high,
            value_area_low,
            total_volume,
            value_area_share,
        })
    }

    /// poc volume / mean bin volume, 0 without volume
    pub fn concentration(&self) -> f64 {
        if self.total_volume <= 0.0 || self.bins.is_empty() {
            return 0.0;
        }
        let mean = self.total_volume / self.bins.len() as f64;
        self.bins[self.poc_index].volume / mean
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VolumeProfileReport {
    pub profile: Option<VolumeProfile>,
    /// Bin midpoints with volume above `hvn_multiple` × mean
    pub high_volume_nodes: Vec<f64>,
    /// Bin midpoints with volume below `lvn_multiple` × mean
    pub low_volume_nodes: Vec<f64>,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VolumeProfileAnalyzer {
    pub lookback: Period,
    pub bins: Period,
    pub value_area: Ratio,
    pub hvn_multiple: f64,
    pub lvn_multiple: f64,
}

impl Default for VolumeProfileAnalyzer {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(100),
            bins: Period::new_const(24),
            value_area: Ratio::new_const(0.7),
            hvn_multiple: 1.5,
            lvn_multiple: 0.5,
        }
    }
}

impl VolumeProfileAnalyzer {
    /// Profile of typical prices over the lookback window
    pub fn profile<T: OHLCV>(&self, bars: &[T]) -> Option<VolumeProfile> {
        let window = &bars[window_start(bars.len(), self.lookback.get())..];
        let points: Vec<(f64, f64)> = window.iter().map(|b| (b.typical_price(), b.volume())).collect();
        VolumeProfile::from_points(&points, self.bins.get(), self.value_area.get())
    }

    /// Value = how far the POC stands above an even spread (0 when uniform
    /// or degenerate). Close above VAH leans bullish, below VAL bearish.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> VolumeProfileReport {
        let profile = self.profile(bars);
        let degenerate = profile
            .as_ref()
            .map_or(true, |p| p.bins.len() < 2 || p.total_volume <= 0.0);

        let (Some(p), Some(last), false) = (profile.as_ref(), bars.last(), degenerate) else {
            return VolumeProfileReport {
                profile,
                high_volume_nodes: Vec::new(),
                low_volume_nodes: Vec::new(),
                score: SubScore::neutral(Factor::VolumeProfile),
            };
        };

        let mean = p.total_volume / p.bins.len() as f64;
        let high_volume_nodes = p
            .bins
            .iter()
            .filter(|b| b.volume > mean * self.hvn_multiple)
            .map(PriceBin::mid)
            .collect();
        let low_volume_nodes = p
            .bins
            .iter()
            .filter(|b| b.volume < mean * self.lvn_multiple)
            .map(PriceBin::mid)
            .collect();

        let close = last.close();
        let signal = if close > p.value_area_high {
            Direction::Bullish
        } else if close < p.value_area_low {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let score = SubScore::new(Factor::VolumeProfile, p.concentration() - 1.0, signal);

        VolumeProfileReport {
            high_volume_nodes,
            low_volume_nodes,
            score,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    #[test]
    fn poc_and_value_area() {
        // 10 bins over [0, 10)
        let points: Vec<(f64, f64)> = vec![
            (0.0, 5.0),
            (4.5, 40.0),
            (5.5, 30.0),
            (6.5, 10.0),
            (9.5, 15.0),
            (10.0, 0.0),
        ];
        let p = VolumeProfile::from_points(&points, 10, 0.7).unwrap();
        assert_eq!(p.bins.len(), 10);
        assert_eq!(p.poc_index, 4);
        assert!((p.poc - 4.5).abs() < 1e-9);
        // 40 + 30 = 70 of 100
        assert!((p.value_area_share - 0.7).abs() < 1e-9);
        assert!((p.value_area_low - 4.0).abs() < 1e-9);
        assert!((p.value_area_high - 6.0).abs() < 1e-9);
    }

    #[test]
    fn zero_range_is_one_bin() {
        let points = vec![(50.0, 10.0), (50.0, 5.0)];
        let p = VolumeProfile::from_points(&points, 24, 0.7).unwrap();
        assert_eq!(p.bins.len(), 1);
        assert_eq!(p.poc, 50.0);
        assert_eq!(p.value_area_share, 1.0);
    }

    #[test]
    fn empty_is_none() {
        assert!(VolumeProfile::from_points(&[], 24, 0.7).is_none());
        let report = VolumeProfileAnalyzer::default().analyze::<Candle>(&[]);
        assert!(report.profile.is_none());
        assert_eq!(report.score.value, 0.0);
    }

    #[test]
    fn zero_volume_is_neutral() {
        let bars: Vec<Candle> = (0..20)
            .map(|i| Candle::new(i, 100.0 + i as f64, 101.0 + i as f64, 99.0 + i as f64, 100.0 + i as f64, 0.0))
            .collect();
        let report = VolumeProfileAnalyzer::default().analyze(&bars);
        assert!(report.profile.is_some());
        assert_eq!(report.score.value, 0.0);
        assert!(report.score.signal.is_neutral());
    }

    #[test]
    fn close_above_value_area_is_bullish() {
        let mut bars: Vec<Candle> = (0..30)
            .map(|i| Candle::new(i, 100.0, 101.0, 99.0, 100.0, 10_000.0))
            .collect();
        bars.push(Candle::new(30, 100.0, 112.0, 100.0, 111.0, 100.0));
        let report = VolumeProfileAnalyzer::default().analyze(&bars);
        assert_eq!(report.score.signal, Direction::Bullish);
        assert!(report.score.value > 0.0);
        assert!(!report.high_volume_nodes.is_empty());
    }
}
