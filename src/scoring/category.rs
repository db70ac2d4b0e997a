//! Category aggregation.

use super::{Category, Factor, SubScore};
use crate::{Direction, Result, SignalError};

/// Weight of each factor inside its category. A category's maximum is the sum
/// of its factors' weights; the defaults give 25/25/20/15/15.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub gap: f64,
    pub order_block: f64,
    pub structure_break: f64,
    pub liquidity_sweep: f64,
    pub delta: f64,
    pub dark_pool: f64,
    pub options: f64,
    pub sentiment: f64,
    pub volume_profile: f64,
    pub absorption: f64,
    pub vwap: f64,
    pub return_distribution: f64,
    pub barriers: f64,
    pub bias: f64,
    pub emotional: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            gap: 7.0,
            order_block: 7.0,
            structure_break: 6.0,
            liquidity_sweep: 5.0,
            delta: 8.0,
            dark_pool: 7.0,
            options: 5.0,
            sentiment: 5.0,
            volume_profile: 7.0,
            absorption: 7.0,
            vwap: 6.0,
            return_distribution: 8.0,
            barriers: 7.0,
            bias: 8.0,
            emotional: 7.0,
        }
    }
}

impl FactorWeights {
    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Gap => self.gap,
            Factor::OrderBlock => self.order_block,
            Factor::StructureBreak => self.structure_break,
            Factor::LiquiditySweep => self.liquidity_sweep,
            Factor::Delta => self.delta,
            Factor::DarkPool => self.dark_pool,
            Factor::Options => self.options,
            Factor::Sentiment => self.sentiment,
            Factor::VolumeProfile => self.volume_profile,
            Factor::Absorption => self.absorption,
            Factor::Vwap => self.vwap,
            Factor::ReturnDistribution => self.return_distribution,
            Factor::Barriers => self.barriers,
            Factor::Bias => self.bias,
            Factor::Emotional => self.emotional,
        }
    }

    pub fn category_max(&self, category: Category) -> f64 {
        category.factors().iter().map(|f| self.weight(*f)).sum()
    }

    /// Sum of every category maximum
    pub fn total(&self) -> f64 {
        Category::ALL.iter().map(|c| self.category_max(*c)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            for &factor in category.factors() {
                let w = self.weight(factor);
                if !w.is_finite() || w < 0.0 {
                    return Err(SignalError::InvalidConfig(format!(
                        "weight for {factor:?} must be finite and >= 0, got {w}"
                    )));
                }
            }
        }
        if self.total() > 100.0 + 1e-9 {
            return Err(SignalError::InvalidConfig(format!(
                "factor weights sum to {}, above the 100-point composite",
                self.total()
            )));
        }
        Ok(())
    }
}

/// Weighted reduction of one category's sibling sub-scores
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    /// In `category.factors()` order
    pub subscores: Vec<SubScore>,
    /// 0.0..=max
    pub total: f64,
    pub max: f64,
    pub signal: Direction,
}

/// Reduce `subscores` to one category. Factors outside the category are
/// ignored; missing siblings count as neutral zero.
pub fn aggregate(category: Category, subscores: &[SubScore], weights: &FactorWeights) -> CategoryScore {
    let ordered: Vec<SubScore> = category
        .factors()
        .iter()
        .map(|&factor| {
            subscores
                .iter()
                .find(|s| s.factor == factor)
                .copied()
                .unwrap_or_else(|| SubScore::neutral(factor))
        })
        .collect();

    let max = weights.category_max(category);
    let weighted: f64 = ordered
        .iter()
        .map(|s| s.fraction() * weights.weight(s.factor))
        .sum();
    let signal = Direction::majority(ordered.iter().map(|s| s.signal));

    CategoryScore {
        category,
        subscores: ordered,
        total: weighted.clamp(0.0, max),
        max,
        signal,
    }
}

/// One [`CategoryScore`] per category, in [`Category::ALL`] order
pub fn aggregate_all(subscores: &[SubScore], weights: &FactorWeights) -> Vec<CategoryScore> {
    Category::ALL
        .iter()
        .map(|&c| aggregate(c, subscores, weights))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_maxima() {
        let w = FactorWeights::default();
        assert_eq!(w.category_max(Category::Structure), 25.0);
        assert_eq!(w.category_max(Category::Flow), 25.0);
        assert_eq!(w.category_max(Category::Auction), 20.0);
        assert_eq!(w.category_max(Category::Statistics), 15.0);
        assert_eq!(w.category_max(Category::Psychology), 15.0);
        assert_eq!(w.total(), 100.0);
    }

    #[test]
    fn weighted_total() {
        let scores = vec![
            SubScore::new(Factor::Gap, 7.0, Direction::Bullish),
            SubScore::new(Factor::OrderBlock, 3.5, Direction::Bullish),
            SubScore::new(Factor::Delta, 8.0, Direction::Bearish),
        ];
        let cat = aggregate(Category::Structure, &scores, &FactorWeights::default());
        assert_eq!(cat.subscores.len(), 4);
        assert!((cat.total - 10.5).abs() < 1e-12);
        assert_eq!(cat.signal, Direction::Bullish);
    }

    #[test]
    fn tie_vote_is_neutral() {
        let scores = vec![
            SubScore::new(Factor::ReturnDistribution, 4.0, Direction::Bullish),
            SubScore::new(Factor::Barriers, 4.0, Direction::Bearish),
        ];
        let cat = aggregate(Category::Statistics, &scores, &FactorWeights::default());
        assert_eq!(cat.signal, Direction::Neutral);
    }

    #[test]
    fn rejects_negative_weight() {
        let w = FactorWeights {
            vwap: -1.0,
            ..FactorWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn rejects_weights_above_hundred() {
        let w = FactorWeights {
            gap: 20.0,
            ..FactorWeights::default()
        };
        assert!(w.validate().is_err());
    }
}
