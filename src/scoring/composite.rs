//! Composite decision: direction, levels, grade, win probability and action.

use super::{build_rationale, CategoryScore, FactorWeights};
use crate::detectors::PatternSet;
use crate::{Direction, PatternEvent, Ratio, Result, SignalError, TradeDirection};

// ============================================================
// GRADE / ACTION
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// 5 for S down to 0 for F
    pub fn rank(self) -> u8 {
        match self {
            Grade::S => 5,
            Grade::A => 4,
            Grade::B => 3,
            Grade::C => 2,
            Grade::D => 1,
            Grade::F => 0,
        }
    }

    /// Whether this grade is at least `min`
    pub fn meets(self, min: Grade) -> bool {
        self.rank() >= min.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StrongEntry,
    Entry,
    Watch,
    Avoid,
    StayOut,
}

/// Lower score bound of each grade; anything below `d` is F
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradeBands {
    pub s: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeBands {
    fn default() -> Self {
        Self {
            s: 90.0,
            a: 80.0,
            b: 70.0,
            c: 60.0,
            d: 50.0,
        }
    }
}

impl GradeBands {
    pub fn grade(&self, score: f64) -> Grade {
        if score >= self.s {
            Grade::S
        } else if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::F
        }
    }

    /// Score interval [lower, upper) covered by `grade`
    pub fn span(&self, grade: Grade) -> (f64, f64) {
        match grade {
            Grade::S => (self.s, 100.0),
            Grade::A => (self.a, self.s),
            Grade::B => (self.b, self.a),
            Grade::C => (self.c, self.b),
            Grade::D => (self.d, self.c),
            Grade::F => (0.0, self.d),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [100.0, self.s, self.a, self.b, self.c, self.d, 0.0];
        if bounds.iter().any(|b| !b.is_finite()) || bounds.windows(2).any(|w| w[0] < w[1]) {
            return Err(SignalError::InvalidConfig(format!(
                "grade bands must descend within [0, 100]: s={} a={} b={} c={} d={}",
                self.s, self.a, self.b, self.c, self.d
            )));
        }
        Ok(())
    }
}

/// Win-probability range (percent) for one grade
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProbabilityBand {
    pub low: f64,
    pub high: f64,
}

impl ProbabilityBand {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WinProbabilityBands {
    pub s: ProbabilityBand,
    pub a: ProbabilityBand,
    pub b: ProbabilityBand,
    pub c: ProbabilityBand,
    pub d: ProbabilityBand,
    pub f: ProbabilityBand,
}

impl Default for WinProbabilityBands {
    fn default() -> Self {
        Self {
            s: ProbabilityBand::new(85.0, 95.0),
            a: ProbabilityBand::new(75.0, 85.0),
            b: ProbabilityBand::new(65.0, 75.0),
            c: ProbabilityBand::new(55.0, 65.0),
            d: ProbabilityBand::new(50.0, 55.0),
            f: ProbabilityBand::new(30.0, 50.0),
        }
    }
}

impl WinProbabilityBands {
    pub fn band(&self, grade: Grade) -> ProbabilityBand {
        match grade {
            Grade::S => self.s,
            Grade::A => self.a,
            Grade::B => self.b,
            Grade::C => self.c,
            Grade::D => self.d,
            Grade::F => self.f,
        }
    }

    /// Linear interpolation across the grade's score span, clamped to its band
    pub fn win_probability(&self, score: f64, grade: Grade, grades: &GradeBands) -> f64 {
        let band = self.band(grade);
        let (lower, upper) = grades.span(grade);
        if upper - lower <= f64::EPSILON {
            return band.low;
        }
        let t = (score - lower) / (upper - lower);
        (band.low + t * (band.high - band.low)).clamp(band.low, band.high)
    }

    pub fn validate(&self) -> Result<()> {
        for grade in [Grade::S, Grade::A, Grade::B, Grade::C, Grade::D, Grade::F] {
            let band = self.band(grade);
            if !(0.0..=100.0).contains(&band.low)
                || !(0.0..=100.0).contains(&band.high)
                || band.low > band.high
            {
                return Err(SignalError::InvalidConfig(format!(
                    "win probability band for {grade:?} must satisfy 0 <= low <= high <= 100, got {}..{}",
                    band.low, band.high
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ActionThresholds {
    /// Also requires grade S
    pub strong_entry: f64,
    /// Also requires grade S or A
    pub entry: f64,
    pub watch: f64,
    pub avoid: f64,
}

impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            strong_entry: 85.0,
            entry: 75.0,
            watch: 60.0,
            avoid: 50.0,
        }
    }
}

impl ActionThresholds {
    pub fn action(&self, score: f64, grade: Grade) -> Action {
        if score >= self.strong_entry && grade == Grade::S {
            Action::StrongEntry
        } else if score >= self.entry && grade.meets(Grade::A) {
            Action::Entry
        } else if score >= self.watch {
            Action::Watch
        } else if score >= self.avoid {
            Action::Avoid
        } else {
            Action::StayOut
        }
    }
}

// ============================================================
// DIRECTION VOTE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSource {
    Gap,
    OrderBlock,
    StructureBreak,
    Zone,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DirectionVotes {
    pub bullish: usize,
    pub bearish: usize,
    pub ballots: Vec<(VoteSource, Direction)>,
}

impl DirectionVotes {
    pub fn from_ballots(ballots: Vec<(VoteSource, Direction)>) -> Self {
        let bullish = ballots.iter().filter(|(_, d)| d.is_bullish()).count();
        let bearish = ballots.iter().filter(|(_, d)| d.is_bearish()).count();
        Self {
            bullish,
            bearish,
            ballots,
        }
    }

    /// Vote counts without ballot provenance
    pub fn from_counts(bullish: usize, bearish: usize) -> Self {
        Self {
            bullish,
            bearish,
            ballots: Vec::new(),
        }
    }

    /// A side wins with at least `min_votes` and strictly more than the other side.
    pub fn resolve(&self, min_votes: usize) -> Option<TradeDirection> {
        if self.bullish >= min_votes && self.bullish > self.bearish {
            Some(TradeDirection::Long)
        } else if self.bearish >= min_votes && self.bearish > self.bullish {
            Some(TradeDirection::Short)
        } else {
            None
        }
    }
}

// ============================================================
// TRADE LEVELS
// ============================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Buffer beyond the protective order block
    pub stop_buffer: Ratio,
    /// Stop distance from entry when no protective block exists
    pub fallback_stop: Ratio,
    /// Risk multiples for the three targets
    pub targets: [f64; 3],
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            stop_buffer: Ratio::new_const(0.002),
            fallback_stop: Ratio::new_const(0.01),
            targets: [2.0, 3.0, 5.0],
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_stop.get() <= 0.0 {
            return Err(SignalError::InvalidConfig(
                "fallback_stop must be > 0".to_string(),
            ));
        }
        if self.targets.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(SignalError::InvalidConfig(format!(
                "target multiples must be finite and > 0, got {:?}",
                self.targets
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Gap,
    OrderBlock,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    OrderBlock,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: [f64; 3],
    pub risk_reward: f64,
    pub entry_source: EntrySource,
    pub stop_source: StopSource,
}

/// Closest active `direction`-side block whose far edge lies beyond `entry`
fn nearest_protective_block<'a>(
    direction: TradeDirection,
    entry: f64,
    patterns: &'a PatternSet,
) -> Option<&'a PatternEvent> {
    let reach = |b: &PatternEvent| match direction {
        TradeDirection::Long => entry - b.bottom,
        TradeDirection::Short => b.top - entry,
    };
    patterns
        .order_blocks
        .iter()
        .filter(|b| b.is_active() && b.direction == direction.supporting())
        .filter(|b| reach(b) > 0.0)
        .min_by(|x, y| reach(x).total_cmp(&reach(y)))
}

/// Entry at the nearest unfilled gap boundary in the trade direction, then the
/// nearest untested order block, then the close. An order-block entry keeps
/// its stop beyond that same block. Otherwise the stop sits beyond the nearest
/// same-direction order block on the protective side of entry, else a fixed
/// distance from entry.
pub fn compute_levels(
    direction: TradeDirection,
    close: f64,
    patterns: &PatternSet,
    cfg: &LevelConfig,
) -> TradeLevels {
    let side = direction.supporting();

    let mut entry_block = None;
    let (entry, entry_source) = if let Some(gap) = patterns.nearest_gap(close, Some(side)) {
        let edge = match direction {
            TradeDirection::Long => gap.bottom,
            TradeDirection::Short => gap.top,
        };
        (edge, EntrySource::Gap)
    } else if let Some(block) = patterns.nearest_order_block(close, Some(side)) {
        entry_block = Some(block);
        let edge = match direction {
            TradeDirection::Long => block.top,
            TradeDirection::Short => block.bottom,
        };
        (edge, EntrySource::OrderBlock)
    } else {
        (close, EntrySource::Close)
    };

    let buffer = cfg.stop_buffer.get();
    let protective = entry_block
        .filter(|b| b.bottom < b.top)
        .or_else(|| nearest_protective_block(direction, entry, patterns));

    let (stop_loss, stop_source) = match (protective, direction) {
        (Some(b), TradeDirection::Long) => (b.bottom * (1.0 - buffer), StopSource::OrderBlock),
        (Some(b), TradeDirection::Short) => (b.top * (1.0 + buffer), StopSource::OrderBlock),
        (None, TradeDirection::Long) => (entry * (1.0 - cfg.fallback_stop.get()), StopSource::Fixed),
        (None, TradeDirection::Short) => (entry * (1.0 + cfg.fallback_stop.get()), StopSource::Fixed),
    };

    let risk = (entry - stop_loss).abs();
    let sign = match direction {
        TradeDirection::Long => 1.0,
        TradeDirection::Short => -1.0,
    };
    let take_profit = cfg.targets.map(|m| entry + sign * risk * m);
    let risk_reward = if risk > 0.0 {
        (take_profit[0] - entry).abs() / risk
    } else {
        0.0
    };

    TradeLevels {
        entry,
        stop_loss,
        take_profit,
        risk_reward,
        entry_source,
        stop_source,
    }
}

// ============================================================
// ASSESSMENT / RECOMMENDATION
// ============================================================

/// Sum of category totals clamped to [0, 100]
pub fn composite_score(categories: &[CategoryScore]) -> f64 {
    let sum: f64 = categories.iter().map(|c| c.total).sum();
    if sum.is_nan() {
        return 0.0;
    }
    sum.clamp(0.0, 100.0)
}

/// Scores and explanation, present whether or not a trade was found
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Assessment {
    pub categories: Vec<CategoryScore>,
    /// 0.0..=100.0
    pub total_score: f64,
    pub grade: Grade,
    /// Percent
    pub win_probability: f64,
    pub action: Action,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeSignal {
    pub direction: TradeDirection,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub take_profit_3: f64,
    pub risk_reward: f64,
    pub entry_source: EntrySource,
    pub stop_source: StopSource,
    #[serde(flatten)]
    pub assessment: Assessment,
}

impl CompositeSignal {
    fn new(direction: TradeDirection, levels: TradeLevels, assessment: Assessment) -> Self {
        let [take_profit_1, take_profit_2, take_profit_3] = levels.take_profit;
        Self {
            direction,
            entry: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit_1,
            take_profit_2,
            take_profit_3,
            risk_reward: levels.risk_reward,
            entry_source: levels.entry_source,
            stop_source: levels.stop_source,
            assessment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Trade(CompositeSignal),
    /// No resolvable direction; action is always stay-out
    NoSignal(Assessment),
}

impl Recommendation {
    pub fn assessment(&self) -> &Assessment {
        match self {
            Recommendation::Trade(signal) => &signal.assessment,
            Recommendation::NoSignal(assessment) => assessment,
        }
    }

    pub fn is_trade(&self) -> bool {
        matches!(self, Recommendation::Trade(_))
    }

    pub fn signal(&self) -> Option<&CompositeSignal> {
        match self {
            Recommendation::Trade(signal) => Some(signal),
            Recommendation::NoSignal(_) => None,
        }
    }

    pub fn direction(&self) -> Option<TradeDirection> {
        self.signal().map(|s| s.direction)
    }
}

// ============================================================
// SCORING CONFIG
// ============================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: FactorWeights,
    pub grades: GradeBands,
    pub win_probability: WinProbabilityBands,
    pub actions: ActionThresholds,
    pub levels: LevelConfig,
    /// Fraction of a factor's maximum that earns a rationale line
    pub notable_fraction: Ratio,
    /// Agreeing votes needed to resolve a direction
    pub min_votes: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            grades: GradeBands::default(),
            win_probability: WinProbabilityBands::default(),
            actions: ActionThresholds::default(),
            levels: LevelConfig::default(),
            notable_fraction: Ratio::new_const(0.7),
            min_votes: 2,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.grades.validate()?;
        self.win_probability.validate()?;
        self.levels.validate()?;
        if self.min_votes == 0 {
            return Err(SignalError::InvalidConfig(
                "min_votes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Score, grade, probability, action and rationale for the categories
    pub fn assess(&self, categories: Vec<CategoryScore>) -> Assessment {
        let total_score = composite_score(&categories);
        let grade = self.grades.grade(total_score);
        let win_probability = self
            .win_probability
            .win_probability(total_score, grade, &self.grades);
        let action = self.actions.action(total_score, grade);
        let rationale = build_rationale(&categories, self.notable_fraction.get());

        Assessment {
            categories,
            total_score,
            grade,
            win_probability,
            action,
            rationale,
        }
    }

    /// Trade when the votes resolve and a positive close exists, else an
    /// explicit no-signal with the action forced to stay-out.
    pub fn decide(
        &self,
        categories: Vec<CategoryScore>,
        votes: &DirectionVotes,
        close: Option<f64>,
        patterns: &PatternSet,
    ) -> Recommendation {
        let mut assessment = self.assess(categories);

        match (votes.resolve(self.min_votes), close) {
            (Some(direction), Some(close)) if close > 0.0 => {
                let levels = compute_levels(direction, close, patterns, &self.levels);
                tracing::debug!(
                    ?direction,
                    entry = levels.entry,
                    stop = levels.stop_loss,
                    entry_source = ?levels.entry_source,
                    "direction resolved"
                );
                Recommendation::Trade(CompositeSignal::new(direction, levels, assessment))
            }
            _ => {
                tracing::debug!(
                    bullish = votes.bullish,
                    bearish = votes.bearish,
                    "no actionable direction"
                );
                assessment.action = Action::StayOut;
                Recommendation::NoSignal(assessment)
            }
        }
    }
}

// ============================================================
// RESULT FILTERING
// ============================================================

/// Signals graded at least `min`, in input order
pub fn filter_by_grade(signals: &[CompositeSignal], min: Grade) -> Vec<&CompositeSignal> {
    signals
        .iter()
        .filter(|s| s.assessment.grade.meets(min))
        .collect()
}

/// The `n` highest-scoring signals; equal scores keep input order
pub fn top_signals(signals: &[CompositeSignal], n: usize) -> Vec<&CompositeSignal> {
    let mut ranked: Vec<&CompositeSignal> = signals.iter().collect();
    ranked.sort_by(|a, b| {
        b.assessment
            .total_score
            .total_cmp(&a.assessment.total_score)
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatternKind;

    fn block(direction: Direction, bottom: f64, top: f64, end: usize) -> PatternEvent {
        PatternEvent {
            kind: PatternKind::ConsolidationBreak,
            direction,
            break_kind: None,
            start_index: end - 1,
            end_index: end,
            top,
            bottom,
            strength: 1.0,
            consumed: false,
        }
    }

    fn signal_with(score: f64, grade: Grade) -> CompositeSignal {
        CompositeSignal {
            direction: TradeDirection::Long,
            entry: 100.0,
            stop_loss: 99.0,
            take_profit_1: 102.0,
            take_profit_2: 103.0,
            take_profit_3: 105.0,
            risk_reward: 2.0,
            entry_source: EntrySource::Close,
            stop_source: StopSource::Fixed,
            assessment: Assessment {
                categories: Vec::new(),
                total_score: score,
                grade,
                win_probability: 50.0,
                action: Action::Watch,
                rationale: Vec::new(),
            },
        }
    }

    #[test]
    fn grade_boundaries() {
        let g = GradeBands::default();
        assert_eq!(g.grade(100.0), Grade::S);
        assert_eq!(g.grade(90.0), Grade::S);
        assert_eq!(g.grade(89.99), Grade::A);
        assert_eq!(g.grade(70.0), Grade::B);
        assert_eq!(g.grade(60.0), Grade::C);
        assert_eq!(g.grade(50.0), Grade::D);
        assert_eq!(g.grade(49.9), Grade::F);
        assert_eq!(g.grade(0.0), Grade::F);
    }

    #[test]
    fn win_probability_interpolates() {
        let g = GradeBands::default();
        let w = WinProbabilityBands::default();
        assert!((w.win_probability(95.0, Grade::S, &g) - 90.0).abs() < 1e-9);
        assert!((w.win_probability(80.0, Grade::A, &g) - 75.0).abs() < 1e-9);
        assert!((w.win_probability(55.0, Grade::D, &g) - 52.5).abs() < 1e-9);
        assert!((w.win_probability(0.0, Grade::F, &g) - 30.0).abs() < 1e-9);
        assert!((w.win_probability(25.0, Grade::F, &g) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn action_requires_grade() {
        let t = ActionThresholds::default();
        assert_eq!(t.action(92.0, Grade::S), Action::StrongEntry);
        assert_eq!(t.action(86.0, Grade::A), Action::Entry);
        assert_eq!(t.action(76.0, Grade::B), Action::Watch);
        assert_eq!(t.action(55.0, Grade::D), Action::Avoid);
        assert_eq!(t.action(10.0, Grade::F), Action::StayOut);
    }

    #[test]
    fn vote_resolution() {
        assert_eq!(DirectionVotes::from_counts(2, 1).resolve(2), Some(TradeDirection::Long));
        assert_eq!(DirectionVotes::from_counts(1, 3).resolve(2), Some(TradeDirection::Short));
        assert_eq!(DirectionVotes::from_counts(1, 1).resolve(2), None);
        assert_eq!(DirectionVotes::from_counts(1, 0).resolve(2), None);
        assert_eq!(DirectionVotes::from_counts(2, 2).resolve(2), None);
    }

    #[test]
    fn fallback_levels_from_close() {
        let levels = compute_levels(
            TradeDirection::Long,
            200.0,
            &PatternSet::default(),
            &LevelConfig::default(),
        );
        assert_eq!(levels.entry, 200.0);
        assert_eq!(levels.entry_source, EntrySource::Close);
        assert!((levels.stop_loss - 198.0).abs() < 1e-9);
        assert!((levels.take_profit[0] - 204.0).abs() < 1e-9);
        assert!((levels.take_profit[1] - 206.0).abs() < 1e-9);
        assert!((levels.take_profit[2] - 210.0).abs() < 1e-9);
        assert!((levels.risk_reward - 2.0).abs() < 1e-9);
    }

    #[test]
    fn short_entry_from_order_block() {
        let mut patterns = PatternSet::default();
        patterns.order_blocks.push(block(Direction::Bearish, 104.0, 106.0, 3));
        patterns.order_blocks.push(block(Direction::Bearish, 110.0, 112.0, 5));
        let levels = compute_levels(TradeDirection::Short, 103.0, &patterns, &LevelConfig::default());
        assert_eq!(levels.entry, 104.0);
        assert_eq!(levels.entry_source, EntrySource::OrderBlock);
        // entry block's top sits above entry and is the closest
        assert!((levels.stop_loss - 106.0 * 1.002).abs() < 1e-9);
        assert_eq!(levels.stop_source, StopSource::OrderBlock);
        assert!(levels.take_profit[0] < levels.entry);
    }

    #[test]
    fn block_entry_stops_beyond_its_own_block() {
        let mut patterns = PatternSet::default();
        patterns.order_blocks.push(block(Direction::Bullish, 95.0, 100.0, 4));
        patterns.order_blocks.push(block(Direction::Bullish, 97.0, 99.5, 6));
        let levels = compute_levels(TradeDirection::Long, 100.5, &patterns, &LevelConfig::default());
        assert_eq!(levels.entry, 100.0);
        assert_eq!(levels.entry_source, EntrySource::OrderBlock);
        // the nested block's bottom is closer to entry but inside the entry block
        assert!((levels.stop_loss - 95.0 * 0.998).abs() < 1e-9);
        assert_eq!(levels.stop_source, StopSource::OrderBlock);
    }

    #[test]
    fn gap_entry_stops_beyond_nearest_block() {
        let mut patterns = PatternSet::default();
        let mut gap = block(Direction::Bullish, 101.0, 103.0, 5);
        gap.kind = PatternKind::Gap;
        patterns.gaps.push(gap);
        patterns.order_blocks.push(block(Direction::Bullish, 95.0, 100.0, 2));
        patterns.order_blocks.push(block(Direction::Bullish, 98.0, 99.0, 3));
        let levels = compute_levels(TradeDirection::Long, 104.0, &patterns, &LevelConfig::default());
        assert_eq!(levels.entry, 101.0);
        assert_eq!(levels.entry_source, EntrySource::Gap);
        assert!((levels.stop_loss - 98.0 * 0.998).abs() < 1e-9);
    }

    #[test]
    fn top_signals_is_stable() {
        let signals = vec![
            signal_with(70.0, Grade::B),
            signal_with(85.0, Grade::A),
            signal_with(70.0, Grade::B),
            signal_with(40.0, Grade::F),
        ];
        let top = top_signals(&signals, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].assessment.total_score, 85.0);
        assert!(std::ptr::eq(top[1], &signals[0]));
        assert!(std::ptr::eq(top[2], &signals[2]));

        assert_eq!(filter_by_grade(&signals, Grade::B).len(), 3);
        assert_eq!(filter_by_grade(&signals, Grade::A).len(), 1);
    }
}
