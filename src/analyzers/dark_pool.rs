//! Off-exchange large-print analysis and the dark-pool index (DIX).
//!
//! A print is flagged when it is both above an absolute size floor and a
//! multiple of the trailing average bar volume. Flagged prints below the latest
//! close are treated as accumulation (price has since moved up through them),
//! prints above it as distribution.

use crate::detectors::{trailing_avg_volume, window_start};
use crate::scoring::{Factor, SubScore};
use crate::state::RingBuffer;
use crate::{Direction, Period, OHLCV};

/// One off-exchange trade report
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LargePrint {
    pub time: i64,
    pub price: f64,
    pub size: f64,
    #[serde(default)]
    pub venue: Option<String>,
}

impl LargePrint {
    pub fn new(time: i64, price: f64, size: f64) -> Self {
        Self {
            time,
            price,
            size,
            venue: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintSide {
    Accumulation,
    Distribution,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlaggedPrint {
    /// Position in the input slice
    pub index: usize,
    pub price: f64,
    pub size: f64,
    pub side: PrintSide,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DarkPoolReport {
    pub flagged: Vec<FlaggedPrint>,
    pub flagged_volume: f64,
    pub accumulation_volume: f64,
    pub distribution_volume: f64,
    /// (accumulation − distribution) / flagged × 100
    pub net_flow: f64,
    /// accumulation / (accumulation + distribution), 0.5 when neither
    pub dix: f64,
    pub dix_trend: Direction,
    /// flagged volume / lit window volume, 0 without lit volume
    pub dark_ratio: f64,
    /// Lit bars whose volume exceeds `large_bar_multiple` × trailing average
    pub large_bars: Vec<usize>,
    pub estimated_hidden_size: f64,
    pub score: SubScore,
}

impl DarkPoolReport {
    fn empty() -> Self {
        Self {
            flagged: Vec::new(),
            flagged_volume: 0.0,
            accumulation_volume: 0.0,
            distribution_volume: 0.0,
            net_flow: 0.0,
            dix: 0.5,
            dix_trend: Direction::Neutral,
            dark_ratio: 0.0,
            large_bars: Vec::new(),
            estimated_hidden_size: 0.0,
            score: SubScore::neutral(Factor::DarkPool),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DarkPoolAnalyzer {
    /// Absolute size floor for a print to count
    pub min_print_size: f64,
    /// Print size must also reach this multiple of average bar volume
    pub size_multiple: f64,
    pub volume_period: Period,
    pub large_bar_multiple: f64,
    /// |net flow| above this leans the signal
    pub flow_threshold: f64,
    /// Readings compared on each side of the DIX trend
    pub trend_window: usize,
    /// Iceberg estimate: visible flagged volume × this
    pub hidden_multiple: f64,
}

impl Default for DarkPoolAnalyzer {
    fn default() -> Self {
        Self {
            min_print_size: 10_000.0,
            size_multiple: 0.1,
            volume_period: Period::new_const(20),
            large_bar_multiple: 2.0,
            flow_threshold: 20.0,
            trend_window: 5,
            hidden_multiple: 7.0,
        }
    }
}

impl DarkPoolAnalyzer {
    /// Latest `trend_window` DIX readings vs the `trend_window` before them.
    /// Neutral until both windows are populated.
    pub fn dix_trend(&self, history: &RingBuffer) -> Direction {
        let w = self.trend_window.max(1);
        if history.len() < 2 * w {
            return Direction::Neutral;
        }
        let (Some(recent), Some(prior)) = (history.window_mean(0, w), history.window_mean(w, w))
        else {
            return Direction::Neutral;
        };
        if recent > prior * 1.1 && recent > 0.55 {
            Direction::Bullish
        } else if recent < prior * 0.9 && recent < 0.45 {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    fn large_bars<T: OHLCV>(&self, bars: &[T]) -> Vec<usize> {
        let start = window_start(bars.len(), self.volume_period.get()).max(1);
        (start..bars.len())
            .filter(|&i| {
                let avg = trailing_avg_volume(bars, i, self.volume_period.get());
                avg > 0.0 && bars[i].volume() > avg * self.large_bar_multiple
            })
            .collect()
    }

    /// Absent prints give the neutral report and leave `dix_history` untouched;
    /// a present (possibly empty) print list pushes one DIX reading.
    pub fn analyze<T: OHLCV>(
        &self,
        prints: Option<&[LargePrint]>,
        bars: &[T],
        dix_history: &mut RingBuffer,
    ) -> DarkPoolReport {
        let Some(prints) = prints else {
            return DarkPoolReport::empty();
        };

        let window = &bars[window_start(bars.len(), self.volume_period.get())..];
        let avg_volume = if window.is_empty() {
            0.0
        } else {
            window.iter().map(|b| b.volume()).sum::<f64>() / window.len() as f64
        };
        let lit_volume: f64 = window.iter().map(|b| b.volume()).sum();
        let reference = bars.last().map(|b| b.close());

        let flagged: Vec<FlaggedPrint> = prints
            .iter()
            .enumerate()
            .filter(|(_, p)| p.size >= self.min_print_size && p.size >= avg_volume * self.size_multiple)
            .map(|(index, p)| {
                let side = match reference {
                    Some(r) if p.price < r => PrintSide::Accumulation,
                    Some(r) if p.price > r => PrintSide::Distribution,
                    _ => PrintSide::Neutral,
                };
                FlaggedPrint {
                    index,
                    price: p.price,
                    size: p.size,
                    side,
                }
            })
            .collect();

        let volume_of = |side: PrintSide| -> f64 {
            flagged.iter().filter(|f| f.side == side).map(|f| f.size).sum()
        };
        let flagged_volume: f64 = flagged.iter().map(|f| f.size).sum();
        let accumulation_volume = volume_of(PrintSide::Accumulation);
        let distribution_volume = volume_of(PrintSide::Distribution);

        let net_flow = if flagged_volume > 0.0 {
            (accumulation_volume - distribution_volume) / flagged_volume * 100.0
        } else {
            0.0
        };
        let directional = accumulation_volume + distribution_volume;
        let dix = if directional > 0.0 {
            accumulation_volume / directional
        } else {
            0.5
        };
        let dark_ratio = if lit_volume > 0.0 {
            flagged_volume / lit_volume
        } else {
            0.0
        };

        dix_history.push(dix);
        let dix_trend = self.dix_trend(dix_history);

        let signal = if net_flow > self.flow_threshold {
            Direction::Bullish
        } else if net_flow < -self.flow_threshold {
            Direction::Bearish
        } else if !flagged.is_empty() {
            dix_trend
        } else {
            Direction::Neutral
        };

        let mut value = 0.0;
        for threshold in [0.3, 0.5, 0.7] {
            if dark_ratio > threshold {
                value += 1.0;
            }
        }
        for threshold in [30.0, 60.0] {
            if net_flow.abs() > threshold {
                value += 1.0;
            }
        }
        if dix > 0.6 || dix < 0.4 {
            value += 1.0;
        }
        if dix > 0.7 || dix < 0.3 {
            value += 1.0;
        }

        tracing::trace!(
            flagged = flagged.len(),
            net_flow,
            dix,
            "dark pool prints classified"
        );

        DarkPoolReport {
            flagged_volume,
            accumulation_volume,
            distribution_volume,
            net_flow,
            dix,
            dix_trend,
            dark_ratio,
            large_bars: self.large_bars(bars),
            estimated_hidden_size: flagged_volume * self.hidden_multiple,
            score: SubScore::new(Factor::DarkPool, value, signal),
            flagged,
        }
    }
}
