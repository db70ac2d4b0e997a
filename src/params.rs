//! Tunable detector parameters
//!
//! Detectors publish their thresholds as [`ParamMeta`] so a calibration run
//! can rebuild them from a flat `HashMap<&str, f64>` and sweep each threshold
//! over its grid without knowing the concrete struct.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use confluence::params::ParameterizedDetector;
//! use confluence::prelude::*;
//!
//! for param in GapDetector::param_meta() {
//!   println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("lookback", 30.0);
//! let gap = GapDetector::checked_params(&overrides).unwrap();
//! assert_eq!(gap.lookback.get(), 30);
//! ```

use std::collections::HashMap;

use crate::{Period, Ratio, Result, SignalError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// How a parameter value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0 (breakout thresholds, zone tolerance)
  Ratio,
  /// Whole number of bars
  Period,
  /// Positive multiplier or divisor (strength scales, volume divisors)
  Scalar,
}

/// Calibration range, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
  pub min: f64,
  pub max: f64,
  /// A non-positive step collapses the grid to `min`
  pub step: f64,
}

impl ParamRange {
  #[inline]
  pub fn contains(&self, value: f64) -> bool {
    value >= self.min && value <= self.max
  }

  /// Number of grid points. Counted up front so the grid never drifts past
  /// `max` through repeated float addition.
  pub fn steps(&self) -> usize {
    if self.step <= 0.0 || self.max < self.min {
      return 1;
    }
    ((self.max - self.min) / self.step + 1e-9).floor() as usize + 1
  }
}

#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Key used in parameter maps, e.g. "breakout_threshold"
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  pub range: ParamRange,
  pub description: &'static str,
}

impl ParamMeta {
  const fn build(
    name: &'static str,
    param_type: ParamType,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    let (min, max, step) = range;
    Self { name, param_type, default, range: ParamRange { min, max, step }, description }
  }

  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self::build(name, ParamType::Ratio, default, range, description)
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self::build(name, ParamType::Period, default, range, description)
  }

  pub const fn scalar(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self::build(name, ParamType::Scalar, default, range, description)
  }

  /// `min, min + step, …` up to and including `max`
  pub fn generate_grid(&self) -> Vec<f64> {
    let ParamRange { min, max, step } = self.range;
    (0..self.range.steps())
      .map(|i| (min + step.max(0.0) * i as f64).min(max.max(min)))
      .collect()
  }

  /// Range check first, then the type's own rule.
  pub fn validate(&self, value: f64) -> Result<()> {
    if value.is_nan() || !self.range.contains(value) {
      return Err(SignalError::OutOfRange {
        field: self.name,
        value,
        min: self.range.min,
        max: self.range.max,
      });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period if value < 1.0 || value.fract() != 0.0 => {
        Err(SignalError::InvalidValue("Period must be a positive integer"))
      },
      ParamType::Scalar if value <= 0.0 => {
        Err(SignalError::InvalidValue("Scalar parameter must be > 0"))
      },
      _ => Ok(()),
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors that can be rebuilt from named parameter values
pub trait ParameterizedDetector: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Missing parameters use their default values. Values only need to be
  /// valid for their type; use [`checked_params`](Self::checked_params) to
  /// also enforce the calibration ranges.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Event family label, e.g. "SMC_FVG"
  fn pattern_name() -> &'static str;

  /// Every parameter at its default
  fn defaults() -> HashMap<&'static str, f64> {
    Self::param_meta().iter().map(|m| (m.name, m.default)).collect()
  }

  /// Like `with_params`, but unknown keys and out-of-range values are errors.
  fn checked_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let meta = Self::param_meta();
    for (&key, &value) in params {
      let Some(m) = meta.iter().find(|m| m.name == key) else {
        return Err(SignalError::InvalidConfig(format!(
          "{} has no parameter named {key}",
          Self::pattern_name()
        )));
      };
      m.validate(value)?;
    }
    Self::with_params(params)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  Ratio::new(params.get(key).copied().unwrap_or(default))
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  match params.get(key).copied() {
    None => Period::new(default),
    Some(v) if v.is_nan() || v < 1.0 => Err(SignalError::InvalidValue("Period must be > 0")),
    Some(v) => Period::new(v as usize),
  }
}

/// Positive finite multiplier with default fallback
pub fn get_scalar(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if value.is_finite() && value > 0.0 {
    Ok(value)
  } else {
    Err(SignalError::InvalidValue("Scalar parameter must be finite and > 0"))
  }
}

// ============================================================
// TESTS
// ============================================================
