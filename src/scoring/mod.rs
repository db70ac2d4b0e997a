//! Score reduction: sub-scores → category totals → composite recommendation.

pub mod category;
pub mod composite;
pub mod rationale;

pub use category::*;
pub use composite::*;
pub use rationale::*;

use crate::Direction;

// ============================================================
// FACTORS
// ============================================================

/// Fixed grouping of factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structure,
    Flow,
    Auction,
    Statistics,
    Psychology,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Structure,
        Category::Flow,
        Category::Auction,
        Category::Statistics,
        Category::Psychology,
    ];

    /// Sibling factors in report order
    pub fn factors(self) -> &'static [Factor] {
        match self {
            Category::Structure => &[
                Factor::Gap,
                Factor::OrderBlock,
                Factor::StructureBreak,
                Factor::LiquiditySweep,
            ],
            Category::Flow => &[Factor::Delta, Factor::DarkPool, Factor::Options, Factor::Sentiment],
            Category::Auction => &[Factor::VolumeProfile, Factor::Absorption, Factor::Vwap],
            Category::Statistics => &[Factor::ReturnDistribution, Factor::Barriers],
            Category::Psychology => &[Factor::Bias, Factor::Emotional],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Structure => "structure",
            Category::Flow => "flow",
            Category::Auction => "auction",
            Category::Statistics => "statistics",
            Category::Psychology => "psychology",
        }
    }
}

/// One scored input to the composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Gap,
    OrderBlock,
    StructureBreak,
    LiquiditySweep,
    Delta,
    DarkPool,
    Options,
    Sentiment,
    VolumeProfile,
    Absorption,
    Vwap,
    ReturnDistribution,
    Barriers,
    Bias,
    Emotional,
}

impl Factor {
    pub fn category(self) -> Category {
        match self {
            Factor::Gap | Factor::OrderBlock | Factor::StructureBreak | Factor::LiquiditySweep => {
                Category::Structure
            }
            Factor::Delta | Factor::DarkPool | Factor::Options | Factor::Sentiment => Category::Flow,
            Factor::VolumeProfile | Factor::Absorption | Factor::Vwap => Category::Auction,
            Factor::ReturnDistribution | Factor::Barriers => Category::Statistics,
            Factor::Bias | Factor::Emotional => Category::Psychology,
        }
    }

    /// Upper bound of the raw sub-score value
    pub fn max(self) -> f64 {
        match self {
            Factor::Gap => 7.0,
            Factor::OrderBlock => 7.0,
            Factor::StructureBreak => 6.0,
            Factor::LiquiditySweep => 5.0,
            Factor::Delta => 8.0,
            Factor::DarkPool => 7.0,
            Factor::Options => 5.0,
            Factor::Sentiment => 5.0,
            Factor::VolumeProfile => 7.0,
            Factor::Absorption => 7.0,
            Factor::Vwap => 6.0,
            Factor::ReturnDistribution => 8.0,
            Factor::Barriers => 7.0,
            Factor::Bias => 8.0,
            Factor::Emotional => 7.0,
        }
    }

    /// Rationale label used when the factor scores well
    pub fn label(self) -> &'static str {
        match self {
            Factor::Gap => "Strong FVG signal",
            Factor::OrderBlock => "Quality order block",
            Factor::StructureBreak => "Clear BOS/CHoCH",
            Factor::LiquiditySweep => "Liquidity sweep detected",
            Factor::Delta => "Strong delta flow",
            Factor::DarkPool => "Significant dark pool activity",
            Factor::Options => "Smart money options flow",
            Factor::Sentiment => "Decisive news sentiment",
            Factor::VolumeProfile => "Concentrated volume profile",
            Factor::Absorption => "Footprint absorption detected",
            Factor::Vwap => "Stretched from VWAP",
            Factor::ReturnDistribution => "Skewed return distribution",
            Factor::Barriers => "Well-defined support/resistance",
            Factor::Bias => "No significant biases detected",
            Factor::Emotional => "Composed emotional state",
        }
    }
}

// ============================================================
// SUB-SCORE
// ============================================================

/// Bounded reading from one detector family or analyzer
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubScore {
    pub factor: Factor,
    /// 0.0..=max
    pub value: f64,
    pub max: f64,
    pub signal: Direction,
}

impl SubScore {
    /// Value is clamped into [0, factor.max()]; NaN becomes 0.
    pub fn new(factor: Factor, value: f64, signal: Direction) -> Self {
        let max = factor.max();
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, max) };
        Self {
            factor,
            value,
            max,
            signal,
        }
    }

    /// Fallback reading for missing or insufficient input
    pub fn neutral(factor: Factor) -> Self {
        Self::new(factor, 0.0, Direction::Neutral)
    }

    /// value / max
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.value / self.max
    }
}
