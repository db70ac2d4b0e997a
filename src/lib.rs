//! # confluence - smart-money pattern detection and composite signal scoring
//!
//! Detects structural features in candle series (fair value gaps, order blocks,
//! structure breaks, liquidity sweeps, premium/discount zones), runs a set of
//! auxiliary analyzers over optional side-channel data (large prints, option
//! chains, sentiment, trade history) and reduces everything into one bounded,
//! explainable trade recommendation.
//!
//! ## Quick Start
//!
//! ```rust
//! use confluence::prelude::*;
//!
//! let candles: Vec<Candle> = (0..60)
//!     .map(|i| {
//!         let base = 100.0 + i as f64 * 0.5;
//!         Candle::new(i, base, base + 1.0, base - 1.0, base + 0.4, 10_000.0)
//!     })
//!     .collect();
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let mut state = AnalyzerState::default();
//!
//! match engine.evaluate(&MarketInput::new(&candles), &mut state).unwrap() {
//!     Recommendation::Trade(signal) => println!("{:?} @ {}", signal.direction, signal.entry),
//!     Recommendation::NoSignal(assessment) => println!("no setup ({:?})", assessment.grade),
//! }
//! ```

pub mod analyzers;
pub mod config;
pub mod detectors;
pub mod params;
pub mod scoring;
pub mod state;

pub mod prelude {
    pub use crate::{
        // Analyzers
        analyzers::*,
        // Configuration
        config::{load_config, AnalyzerConfig, DetectorConfig, EngineConfig},
        // Detectors
        detectors::*,
        // Parallel
        evaluate_parallel,
        // Parameters
        params::{get_period, get_ratio, get_scalar, ParamMeta, ParamType, ParameterizedDetector},
        // Scoring
        scoring::*,
        // State
        state::{AnalyzerState, RingBuffer, StateBook, StateKey},
        Analysis,
        BreakKind,
        Candle,
        Direction,
        EngineBuilder,
        EvaluationError,
        EvaluationJob,
        EvaluationResult,
        MarketInput,
        OHLCVExt,
        PatternDetector,
        PatternEvent,
        PatternKind,
        Period,
        Ratio,
        Result,
        SignalEngine,
        SignalError,
        TradeDirection,
        OHLCV,
    };
}

use analyzers::{AnalyzerReports, LargePrint, OptionChain, SentimentItem, TradeOutcome};
use detectors::{PatternSet, ZoneReading};
use scoring::{CategoryScore, Recommendation, SubScore};
use state::AnalyzerState;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors surfaced to the caller.
///
/// Sparse or empty market data never produces an error; analyzers fall back to
/// their neutral readings instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Failed to read config file: {0}")]
    ConfigIo(String),

    #[error("Failed to parse TOML: {0}")]
    ConfigParse(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SignalError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SignalError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SignalError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// (high + low + close) / 3
    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Where the close sits inside the bar range, 0.0 = low, 1.0 = high.
    /// Returns None if range ≈ 0
    #[inline]
    fn close_location(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| (self.close() - self.low()) / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if values.iter().any(|v| *v < 0.0) {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "negative price or volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Plain candle record. Any type implementing [`OHLCV`] works with the
/// detectors and analyzers; this one exists for callers that have no bar type
/// of their own and for serialized inputs.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.time)
    }
}

// ============================================================
// DIRECTION
// ============================================================

/// Three-valued directional reading shared by events, sub-scores and categories
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, Direction::Neutral)
    }

    /// Majority between bullish and bearish counts; an exact tie is neutral.
    pub fn from_votes(bullish: usize, bearish: usize) -> Self {
        match bullish.cmp(&bearish) {
            std::cmp::Ordering::Greater => Direction::Bullish,
            std::cmp::Ordering::Less => Direction::Bearish,
            std::cmp::Ordering::Equal => Direction::Neutral,
        }
    }

    /// Majority vote over a set of readings
    pub fn majority<I: IntoIterator<Item = Direction>>(readings: I) -> Self {
        let (bullish, bearish) = readings
            .into_iter()
            .fold((0, 0), |(bull, bear), d| match d {
                Direction::Bullish => (bull + 1, bear),
                Direction::Bearish => (bull, bear + 1),
                Direction::Neutral => (bull, bear),
            });
        Self::from_votes(bullish, bearish)
    }
}

/// Side of a resolved trade setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// Event direction that supports this trade
    #[inline]
    pub fn supporting(self) -> Direction {
        match self {
            TradeDirection::Long => Direction::Bullish,
            TradeDirection::Short => Direction::Bearish,
        }
    }
}

// ============================================================
// PATTERN EVENT - result of detection
// ============================================================

/// Family of structural pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Three-candle fair value gap
    Gap,
    /// Candle preceding a strong breakout (order block)
    ConsolidationBreak,
    /// BOS or CHoCH between consecutive same-type swings
    StructureBreak,
    /// Breach of the prior window's extreme
    LiquiditySweep,
}

impl PatternKind {
    /// Upper bound of the strength scalar for this kind
    pub fn max_strength(self) -> f64 {
        match self {
            PatternKind::Gap => 7.0,
            PatternKind::ConsolidationBreak => 7.0,
            PatternKind::StructureBreak => 6.0,
            PatternKind::LiquiditySweep => 5.0,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Gap => "SMC_FVG",
            PatternKind::ConsolidationBreak => "SMC_ORDER_BLOCK",
            PatternKind::StructureBreak => "SMC_STRUCTURE_BREAK",
            PatternKind::LiquiditySweep => "SMC_LIQUIDITY_SWEEP",
        }
    }
}

/// Break of Structure (continuation) or Change of Character (reversal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BreakKind {
    Bos,
    Choch,
}

/// One detected structural feature.
///
/// `top`/`bottom` bound the zone; level events (structure breaks, sweeps) have
/// `top == bottom`. `consumed` is only ever set by an explicit mitigation pass
/// ([`detectors::mark_consumed`]).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternEvent {
    pub kind: PatternKind,
    pub direction: Direction,
    /// Only set for structure breaks
    pub break_kind: Option<BreakKind>,
    pub start_index: usize,
    pub end_index: usize,
    pub top: f64,
    pub bottom: f64,
    /// 0.0..=kind.max_strength()
    pub strength: f64,
    pub consumed: bool,
}

impl PatternEvent {
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.consumed
    }

    /// Distance from `price` to the closer boundary
    #[inline]
    pub fn distance_to(&self, price: f64) -> f64 {
        (price - self.top).abs().min((price - self.bottom).abs())
    }

    /// Whether `bar` trades back into this event's zone or level.
    ///
    /// Gaps need a strict overlap with the open interval; touching an edge does
    /// not fill them. Blocks and levels count any touch.
    pub fn is_revisited_by<T: OHLCV>(&self, bar: &T) -> bool {
        match self.kind {
            PatternKind::Gap => bar.low() < self.top && bar.high() > self.bottom,
            _ => bar.low() <= self.top && bar.high() >= self.bottom,
        }
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Window detector over a candle slice.
///
/// Implementations are pure: the same slice always yields the same events, and
/// a slice shorter than `min_bars()` yields none.
pub trait PatternDetector: Send + Sync {
    fn kind(&self) -> PatternKind;
    fn min_bars(&self) -> usize;
    fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// MARKET INPUT
// ============================================================

/// One evaluation's inputs. Everything is borrowed from the caller and
/// dropped when the call returns.
#[derive(Debug)]
pub struct MarketInput<'a, T: OHLCV> {
    pub candles: &'a [T],
    pub prints: Option<&'a [LargePrint]>,
    pub options: Option<&'a OptionChain>,
    pub sentiment: Option<&'a [SentimentItem]>,
    pub trades: Option<&'a [TradeOutcome]>,
}

impl<'a, T: OHLCV> Clone for MarketInput<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: OHLCV> Copy for MarketInput<'a, T> {}

impl<'a, T: OHLCV> MarketInput<'a, T> {
    pub fn new(candles: &'a [T]) -> Self {
        Self {
            candles,
            prints: None,
            options: None,
            sentiment: None,
            trades: None,
        }
    }

    pub fn with_prints(mut self, prints: &'a [LargePrint]) -> Self {
        self.prints = Some(prints);
        self
    }

    pub fn with_options(mut self, chain: &'a OptionChain) -> Self {
        self.options = Some(chain);
        self
    }

    pub fn with_sentiment(mut self, items: &'a [SentimentItem]) -> Self {
        self.sentiment = Some(items);
        self
    }

    pub fn with_trades(mut self, trades: &'a [TradeOutcome]) -> Self {
        self.trades = Some(trades);
        self
    }
}

// ============================================================
// SIGNAL ENGINE
// ============================================================

use detectors::{mark_consumed, BuiltinDetector, RangeZoneClassifier};

/// Everything one evaluation produced, from raw events up to the final call
#[derive(Debug, Clone, serde::Serialize)]
pub struct Analysis {
    pub patterns: PatternSet,
    pub zone: Option<ZoneReading>,
    pub reports: AnalyzerReports,
    pub categories: Vec<CategoryScore>,
    pub recommendation: Recommendation,
}

/// Main evaluation engine
#[derive(Debug, Clone)]
pub struct SignalEngine {
    builtin: Vec<BuiltinDetector>,
    config: config::EngineConfig,
}

impl SignalEngine {
    pub fn config(&self) -> &config::EngineConfig {
        &self.config
    }

    /// Run every detector and mark events later price action has revisited.
    pub fn detect_patterns<T: OHLCV>(&self, bars: &[T]) -> PatternSet {
        let mut set = PatternSet::default();

        for detector in &self.builtin {
            if bars.len() < detector.min_bars() {
                continue;
            }
            let mut events = detector.detect(bars);
            mark_consumed(&mut events, bars);
            set.extend(detector.kind(), events);
        }

        tracing::trace!(
            gaps = set.gaps.len(),
            order_blocks = set.order_blocks.len(),
            structure_breaks = set.structure_breaks.len(),
            sweeps = set.sweeps.len(),
            "pattern scan complete"
        );

        set
    }

    /// Full evaluation. `state` carries the trailing delta and dark-index
    /// history for this instrument and is updated in place.
    pub fn analyze<T: OHLCV>(
        &self,
        input: &MarketInput<'_, T>,
        state: &mut AnalyzerState,
    ) -> Result<Analysis> {
        let bars = input.candles;
        if self.config.validate_data {
            validate_bars(bars)?;
        }

        let patterns = self.detect_patterns(bars);
        let zone = self.config.detectors.zone.classify(bars);
        let close = bars.last().map(|b| b.close());

        let reports = self.run_analyzers(input, state);

        let mut subscores: Vec<SubScore> = patterns.subscores(close);
        subscores.extend(reports.subscores());

        let scoring = &self.config.scoring;
        let categories = scoring::aggregate_all(&subscores, &scoring.weights);
        let votes = patterns.votes(close, zone.as_ref());
        let recommendation = scoring.decide(categories.clone(), &votes, close, &patterns);

        tracing::debug!(
            bars = bars.len(),
            bullish_votes = votes.bullish,
            bearish_votes = votes.bearish,
            score = recommendation.assessment().total_score,
            grade = ?recommendation.assessment().grade,
            trade = recommendation.is_trade(),
            "evaluation complete"
        );

        Ok(Analysis {
            patterns,
            zone,
            reports,
            categories,
            recommendation,
        })
    }

    /// Evaluate and keep only the final recommendation.
    pub fn evaluate<T: OHLCV>(
        &self,
        input: &MarketInput<'_, T>,
        state: &mut AnalyzerState,
    ) -> Result<Recommendation> {
        self.analyze(input, state).map(|a| a.recommendation)
    }

    fn run_analyzers<T: OHLCV>(
        &self,
        input: &MarketInput<'_, T>,
        state: &mut AnalyzerState,
    ) -> AnalyzerReports {
        let bars = input.candles;
        let cfg = &self.config.analyzers;
        let spot = bars.last().map(|b| b.close());

        AnalyzerReports {
            order_flow: cfg.order_flow.analyze(bars, state.delta_mut()),
            dark_pool: cfg.dark_pool.analyze(input.prints, bars, state.dix_mut()),
            options: cfg.options.analyze(input.options, spot),
            sentiment: cfg.sentiment.analyze(input.sentiment),
            volume_profile: cfg.volume_profile.analyze(bars),
            absorption: cfg.absorption.analyze(bars),
            vwap: cfg.vwap.analyze(bars),
            distribution: cfg.distribution.analyze(bars),
            barriers: cfg.barriers.analyze(bars),
            bias: cfg.bias.analyze(input.trades),
            emotion: cfg.emotion.analyze(input.trades),
        }
    }
}

fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            SignalError::InvalidOHLCV { reason, .. } => {
                SignalError::InvalidOHLCV { index: i, reason }
            }
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SignalEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: config::EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full configuration (e.g. one loaded from TOML)
    pub fn with_config(config: config::EngineConfig) -> Self {
        Self { config }
    }

    /// Replace the detector of the same family
    pub fn detector(mut self, detector: BuiltinDetector) -> Self {
        let detectors = &mut self.config.detectors;
        match detector {
            BuiltinDetector::Gap(d) => detectors.gap = d,
            BuiltinDetector::OrderBlock(d) => detectors.order_block = d,
            BuiltinDetector::Structure(d) => detectors.structure = d,
            BuiltinDetector::LiquiditySweep(d) => detectors.liquidity = d,
        }
        self
    }

    pub fn zone_classifier(mut self, classifier: RangeZoneClassifier) -> Self {
        self.config.detectors.zone = classifier;
        self
    }

    pub fn analyzers(mut self, analyzers: config::AnalyzerConfig) -> Self {
        self.config.analyzers = analyzers;
        self
    }

    pub fn scoring(mut self, scoring: scoring::ScoringConfig) -> Self {
        self.config.scoring = scoring;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SignalEngine> {
        self.config.validate()?;
        let builtin = self.config.detectors.builtin();
        Ok(SignalEngine {
            builtin,
            config: self.config,
        })
    }
}

// ============================================================
// PARALLEL EVALUATION
// ============================================================

use rayon::prelude::*;

/// One instrument's evaluation request. The state borrow is exclusive, so one
/// instrument's history can never be touched by two jobs at once.
#[derive(Debug)]
pub struct EvaluationJob<'a, T: OHLCV> {
    pub symbol: &'a str,
    pub input: MarketInput<'a, T>,
    pub state: &'a mut AnalyzerState,
}

/// Result of evaluating a single instrument
#[derive(Debug)]
pub struct EvaluationResult {
    pub symbol: String,
    pub recommendation: Recommendation,
}

/// Error from evaluating a single instrument
#[derive(Debug)]
pub struct EvaluationError {
    pub symbol: String,
    pub error: SignalError,
}

/// Parallel evaluation of independent instruments
pub fn evaluate_parallel<'a, T, I>(
    engine: &SignalEngine,
    jobs: I,
) -> (Vec<EvaluationResult>, Vec<EvaluationError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = EvaluationJob<'a, T>>,
{
    let results: Vec<_> = jobs
        .into_par_iter()
        .map(|job| {
            engine
                .evaluate(&job.input, job.state)
                .map(|recommendation| EvaluationResult {
                    symbol: job.symbol.to_string(),
                    recommendation,
                })
                .map_err(|error| EvaluationError {
                    symbol: job.symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
