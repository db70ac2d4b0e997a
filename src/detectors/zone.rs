//! Premium / discount classification of the latest close.

use super::helpers::{extremes, window_start};
use crate::{Direction, Period, Ratio, Result, SignalError, OHLCV};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Premium,
    Equilibrium,
    Discount,
}

impl Zone {
    /// Discount favours longs, premium favours shorts
    pub fn vote(self) -> Direction {
        match self {
            Zone::Discount => Direction::Bullish,
            Zone::Premium => Direction::Bearish,
            Zone::Equilibrium => Direction::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZoneReading {
    pub zone: Zone,
    pub range_high: f64,
    pub range_low: f64,
    pub equilibrium: f64,
    pub close: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RangeZoneClassifier {
    pub lookback: Period,
    /// Band around equilibrium, as a fraction of equilibrium
    pub tolerance: Ratio,
}

impl Default for RangeZoneClassifier {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            tolerance: Ratio::new_const(0.01),
        }
    }
}

impl RangeZoneClassifier {
    /// None for an empty slice
    pub fn classify<T: OHLCV>(&self, bars: &[T]) -> Option<ZoneReading> {
        let window = &bars[window_start(bars.len(), self.lookback.get())..];
        let (range_high, range_low) = extremes(window)?;
        let close = window.last()?.close();

        let equilibrium = (range_high + range_low) / 2.0;
        let band = equilibrium.abs() * self.tolerance.get();

        let zone = if close > equilibrium + band {
            Zone::Premium
        } else if close < equilibrium - band {
            Zone::Discount
        } else {
            Zone::Equilibrium
        };

        Some(ZoneReading {
            zone,
            range_high,
            range_low,
            equilibrium,
            close,
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.tolerance.get() >= 0.5 {
            return Err(SignalError::InvalidConfig(format!(
                "zone tolerance {} leaves no premium or discount",
                self.tolerance.get()
            )));
        }
        Ok(())
    }
}
