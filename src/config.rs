//! Engine configuration.
//!
//! Every tunable constant lives in one of these structs. All of them use
//! `#[serde(default)]`, so a TOML file only needs the keys it overrides:
//!
//! ```toml
//! validate_data = true
//!
//! [detectors.gap]
//! lookback = 30
//!
//! [analyzers.dark_pool]
//! min_print_size = 25000.0
//!
//! [scoring.grades]
//! s = 92.0
//! ```

use std::path::Path;

use crate::analyzers::{
    AbsorptionAnalyzer, BarrierClusterAnalyzer, BiasDetector, DarkPoolAnalyzer,
    EmotionalStateAnalyzer, OptionsFlowAnalyzer, OrderFlowAnalyzer, ReturnDistributionAnalyzer,
    SentimentAnalyzer, VolumeProfileAnalyzer, VwapAnalyzer,
};
use crate::detectors::{
    BuiltinDetector, GapDetector, LiquiditySweepDetector, OrderBlockDetector, RangeZoneClassifier,
    StructureDetector,
};
use crate::scoring::ScoringConfig;
use crate::{PatternDetector, Result, SignalError};

/// Detector parameters, one entry per family
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub gap: GapDetector,
    pub order_block: OrderBlockDetector,
    pub structure: StructureDetector,
    pub liquidity: LiquiditySweepDetector,
    pub zone: RangeZoneClassifier,
}

impl DetectorConfig {
    /// Detectors in scan order
    pub fn builtin(&self) -> Vec<BuiltinDetector> {
        vec![
            self.gap.clone().into(),
            self.order_block.clone().into(),
            self.structure.clone().into(),
            self.liquidity.clone().into(),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        self.gap.validate_config()?;
        self.order_block.validate_config()?;
        self.structure.validate_config()?;
        self.liquidity.validate_config()?;
        self.zone.validate_config()
    }
}

/// Analyzer parameters
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub order_flow: OrderFlowAnalyzer,
    pub dark_pool: DarkPoolAnalyzer,
    pub options: OptionsFlowAnalyzer,
    pub sentiment: SentimentAnalyzer,
    pub volume_profile: VolumeProfileAnalyzer,
    pub absorption: AbsorptionAnalyzer,
    pub vwap: VwapAnalyzer,
    pub distribution: ReturnDistributionAnalyzer,
    pub barriers: BarrierClusterAnalyzer,
    pub bias: BiasDetector,
    pub emotion: EmotionalStateAnalyzer,
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SignalError::InvalidConfig(format!(
            "{field} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SignalError::InvalidConfig(format!(
            "{field} must be > 0, got {value}"
        )));
    }
    Ok(())
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        positive("order_flow.signal_multiple", self.order_flow.signal_multiple)?;
        non_negative("order_flow.score_scale", self.order_flow.score_scale)?;

        non_negative("dark_pool.min_print_size", self.dark_pool.min_print_size)?;
        non_negative("dark_pool.size_multiple", self.dark_pool.size_multiple)?;
        positive("dark_pool.large_bar_multiple", self.dark_pool.large_bar_multiple)?;

        positive("options.skew_ratio", self.options.skew_ratio)?;
        if self.options.bullish_put_call >= self.options.bearish_put_call {
            return Err(SignalError::InvalidConfig(format!(
                "options.bullish_put_call ({}) must be below bearish_put_call ({})",
                self.options.bullish_put_call, self.options.bearish_put_call
            )));
        }
        positive("options.contract_multiplier", self.options.contract_multiplier)?;

        if self.sentiment.strong_sentiment < self.sentiment.trend_threshold {
            return Err(SignalError::InvalidConfig(
                "sentiment.strong_sentiment must be >= trend_threshold".to_string(),
            ));
        }
        if self.sentiment.fast_velocity < self.sentiment.active_velocity {
            return Err(SignalError::InvalidConfig(
                "sentiment.fast_velocity must be >= active_velocity".to_string(),
            ));
        }

        if self.volume_profile.value_area.get() <= 0.0 {
            return Err(SignalError::InvalidConfig(
                "volume_profile.value_area must be > 0".to_string(),
            ));
        }
        if self.volume_profile.lvn_multiple > self.volume_profile.hvn_multiple {
            return Err(SignalError::InvalidConfig(
                "volume_profile.lvn_multiple must be <= hvn_multiple".to_string(),
            ));
        }

        let a = &self.absorption;
        if !(a.min_ratio <= a.medium_ratio && a.medium_ratio <= a.high_ratio) {
            return Err(SignalError::InvalidConfig(format!(
                "absorption ratios must ascend, got {}/{}/{}",
                a.min_ratio, a.medium_ratio, a.high_ratio
            )));
        }

        non_negative("vwap.sigma_weight", self.vwap.sigma_weight)?;
        non_negative("distribution.signal_sigma", self.distribution.signal_sigma)?;

        if self.barriers.min_touches == 0 || self.barriers.touch_saturation == 0 {
            return Err(SignalError::InvalidConfig(
                "barriers.min_touches and touch_saturation must be >= 1".to_string(),
            ));
        }

        positive("emotion.stress_per_loss", self.emotion.stress_per_loss)?;
        let e = &self.emotion;
        if !(e.good_level <= e.caution_level && e.caution_level <= e.stop_level) {
            return Err(SignalError::InvalidConfig(
                "emotion levels must ascend good <= caution <= stop".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detectors: DetectorConfig,
    pub analyzers: AnalyzerConfig,
    pub scoring: ScoringConfig,
    /// Reject malformed bars before evaluation
    pub validate_data: bool,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| SignalError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.detectors.validate()?;
        self.analyzers.validate()?;
        self.scoring.validate()
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| SignalError::ConfigIo(e.to_string()))?;
    EngineConfig::from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        assert_eq!(DetectorConfig::default().builtin().len(), 4);
    }

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert!(!config.validate_data);
        assert_eq!(config.analyzers, AnalyzerConfig::default());
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn partial_override() {
        let toml = r#"
            validate_data = true

            [detectors.gap]
            lookback = 30

            [analyzers.dark_pool]
            min_print_size = 25000.0

            [scoring]
            min_votes = 3
        "#;
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert!(config.validate_data);
        assert_eq!(config.detectors.gap.lookback.get(), 30);
        assert_eq!(config.analyzers.dark_pool.min_print_size, 25_000.0);
        assert_eq!(config.analyzers.dark_pool.trend_window, 5);
        assert_eq!(config.scoring.min_votes, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("[detectors.gap]\nlookback = 0\n").unwrap_err();
        assert!(matches!(err, SignalError::ConfigParse(_)));

        let err = EngineConfig::from_toml_str("[analyzers.options]\nbullish_put_call = 2.0\n")
            .unwrap_err();
        assert!(matches!(err, SignalError::InvalidConfig(_)));

        let err = EngineConfig::from_toml_str("[scoring]\nmin_votes = 0\n").unwrap_err();
        assert!(matches!(err, SignalError::InvalidConfig(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analyzers.sentiment]\ntrend_threshold = 10.0").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analyzers.sentiment.trend_threshold, 10.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SignalError::ConfigIo(_)));
    }
}
