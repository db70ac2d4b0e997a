//! Absorption: heavy volume that fails to move price.

use crate::detectors::trailing_avg_volume;
use crate::scoring::{Factor, SubScore};
use crate::{Direction, OHLCVExt, Period, Ratio, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorptionLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AbsorptionEvent {
    pub index: usize,
    /// Bar volume / trailing average volume
    pub volume_ratio: f64,
    /// |close − open| / open
    pub price_move: f64,
    pub level: AbsorptionLevel,
    /// Close in the upper half means selling was absorbed
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AbsorptionReport {
    pub events: Vec<AbsorptionEvent>,
    pub strongest: Option<AbsorptionEvent>,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AbsorptionAnalyzer {
    /// Most recent bars checked
    pub recent: Period,
    pub volume_period: Period,
    /// Largest body move that still counts as "held"
    pub max_move: Ratio,
    pub min_ratio: f64,
    pub medium_ratio: f64,
    pub high_ratio: f64,
}

impl Default for AbsorptionAnalyzer {
    fn default() -> Self {
        Self {
            recent: Period::new_const(3),
            volume_period: Period::new_const(20),
            max_move: Ratio::new_const(0.001),
            min_ratio: 2.0,
            medium_ratio: 3.0,
            high_ratio: 5.0,
        }
    }
}

impl AbsorptionAnalyzer {
    fn level(&self, ratio: f64) -> AbsorptionLevel {
        if ratio > self.high_ratio {
            AbsorptionLevel::High
        } else if ratio > self.medium_ratio {
            AbsorptionLevel::Medium
        } else {
            AbsorptionLevel::Low
        }
    }

    pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<AbsorptionEvent> {
        let first = bars.len().saturating_sub(self.recent.get()).max(1);
        (first..bars.len())
            .filter_map(|i| {
                let bar = &bars[i];
                let avg = trailing_avg_volume(bars, i, self.volume_period.get());
                if avg <= 0.0 || bar.open() <= 0.0 {
                    return None;
                }
                let volume_ratio = bar.volume() / avg;
                let price_move = bar.body() / bar.open();
                if volume_ratio <= self.min_ratio || price_move >= self.max_move.get() {
                    return None;
                }
                let direction = match bar.close_location() {
                    Some(loc) if loc > 0.5 => Direction::Bullish,
                    Some(loc) if loc < 0.5 => Direction::Bearish,
                    _ => Direction::Neutral,
                };
                Some(AbsorptionEvent {
                    index: i,
                    volume_ratio,
                    price_move,
                    level: self.level(volume_ratio),
                    direction,
                })
            })
            .collect()
    }

    /// Scores the strongest recent event: 3 / 5 / 7 for low / medium / high.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> AbsorptionReport {
        let events = self.detect(bars);
        let strongest = events
            .iter()
            .copied()
            .reduce(|best, e| if e.volume_ratio >= best.volume_ratio { e } else { best });

        let score = match strongest {
            Some(e) => {
                let value = match e.level {
                    AbsorptionLevel::High => 7.0,
                    AbsorptionLevel::Medium => 5.0,
                    AbsorptionLevel::Low => 3.0,
                };
                SubScore::new(Factor::Absorption, value, e.direction)
            }
            None => SubScore::neutral(Factor::Absorption),
        };

        AbsorptionReport {
            events,
            strongest,
            score,
        }
    }
}
