//! Auxiliary analyzers
//!
//! Each analyzer is a plain config struct with an `analyze` method returning a
//! report. Every report carries a [`SubScore`]; missing or short inputs produce
//! the analyzer's neutral fallback instead of an error.

pub mod absorption;
pub mod dark_pool;
pub mod distribution;
pub mod options_flow;
pub mod order_flow;
pub mod psychology;
pub mod sentiment;
pub mod volume_profile;
pub mod vwap;

pub use absorption::*;
pub use dark_pool::*;
pub use distribution::*;
pub use options_flow::*;
pub use order_flow::*;
pub use psychology::*;
pub use sentiment::*;
pub use volume_profile::*;
pub use vwap::*;

use crate::scoring::SubScore;

/// Reports from one evaluation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalyzerReports {
    pub order_flow: OrderFlowReport,
    pub dark_pool: DarkPoolReport,
    pub options: OptionsReport,
    pub sentiment: SentimentReport,
    pub volume_profile: VolumeProfileReport,
    pub absorption: AbsorptionReport,
    pub vwap: VwapReport,
    pub distribution: DistributionReport,
    pub barriers: BarrierReport,
    pub bias: BiasReport,
    pub emotion: EmotionReport,
}

impl AnalyzerReports {
    /// Sub-scores for the flow, auction, statistics and psychology categories
    pub fn subscores(&self) -> Vec<SubScore> {
        vec![
            self.order_flow.score,
            self.dark_pool.score,
            self.options.score,
            self.sentiment.score,
            self.volume_profile.score,
            self.absorption.score,
            self.vwap.score,
            self.distribution.score,
            self.barriers.score,
            self.bias.score,
            self.emotion.score,
        ]
    }
}

/// Mean of a slice, None when empty
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation around `mean`
pub(crate) fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
