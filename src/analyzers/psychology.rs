//! Trader psychology read from the trade-outcome history.
//!
//! Both analyzers only look at completed trades. With fewer trades than their
//! `min_history` they report nothing and score zero. Neither votes on
//! direction: a composed trader scores well regardless of which side the
//! market favours.

use super::mean;
use crate::scoring::{Factor, SubScore};
use crate::{Direction, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeResult {
    Win,
    Loss,
    Breakeven,
}

/// One completed trade
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeOutcome {
    pub result: TradeResult,
    #[serde(default)]
    pub pnl: f64,
    /// Holding time
    pub duration_secs: f64,
    /// Self-reported conviction at entry, 0..=10
    pub conviction: f64,
}

impl TradeOutcome {
    pub fn new(result: TradeResult, duration_secs: f64, conviction: f64) -> Self {
        Self {
            result,
            pnl: 0.0,
            duration_secs,
            conviction,
        }
    }

    pub fn with_pnl(mut self, pnl: f64) -> Self {
        self.pnl = pnl;
        self
    }

    #[inline]
    pub fn is_win(&self) -> bool {
        self.result == TradeResult::Win
    }

    #[inline]
    pub fn is_loss(&self) -> bool {
        self.result == TradeResult::Loss
    }
}

fn recent(trades: &[TradeOutcome], n: usize) -> &[TradeOutcome] {
    &trades[trades.len().saturating_sub(n)..]
}

fn avg_by<F>(trades: &[TradeOutcome], f: F) -> Option<f64>
where
    F: Fn(&TradeOutcome) -> f64,
{
    let values: Vec<f64> = trades.iter().map(f).collect();
    mean(&values)
}

// ============================================================
// BIASES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Recency,
    Overconfidence,
    LossAversion,
    Herd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    fn penalty(self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BiasFinding {
    pub kind: BiasKind,
    pub severity: Severity,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BiasReport {
    pub findings: Vec<BiasFinding>,
    /// Any high-severity finding
    pub alert: bool,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BiasDetector {
    pub min_history: usize,
    /// Trades treated as "recent"
    pub recent: Period,
    /// Recent wins at or above this (or at or below `streak_low`) flag recency
    pub streak_high: usize,
    pub streak_low: usize,
    /// Loss holding time / win holding time that flags loss aversion
    pub hold_ratio: f64,
    pub hold_ratio_high: f64,
    /// Recent conviction / overall conviction that flags overconfidence
    pub conviction_rise: f64,
    /// Conviction below this marks a trade taken without an own view
    pub low_conviction: f64,
    /// Share of recent low-conviction trades that flags herding
    pub herd_share: f64,
}

impl Default for BiasDetector {
    fn default() -> Self {
        Self {
            min_history: 5,
            recent: Period::new_const(5),
            streak_high: 4,
            streak_low: 1,
            hold_ratio: 1.5,
            hold_ratio_high: 2.5,
            conviction_rise: 1.2,
            low_conviction: 4.0,
            herd_share: 0.6,
        }
    }
}

impl BiasDetector {
    fn recency(&self, window: &[TradeOutcome]) -> Option<BiasFinding> {
        let wins = window.iter().filter(|t| t.is_win()).count();
        if wins < self.streak_high && wins > self.streak_low {
            return None;
        }
        let severity = if wins == window.len() || wins == 0 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(BiasFinding {
            kind: BiasKind::Recency,
            severity,
            detail: format!("{wins} wins in the last {} trades", window.len()),
        })
    }

    fn loss_aversion(&self, trades: &[TradeOutcome]) -> Option<BiasFinding> {
        let wins: Vec<TradeOutcome> = trades.iter().copied().filter(TradeOutcome::is_win).collect();
        let losses: Vec<TradeOutcome> = trades.iter().copied().filter(TradeOutcome::is_loss).collect();
        let win_hold = avg_by(&wins, |t| t.duration_secs)?;
        let loss_hold = avg_by(&losses, |t| t.duration_secs)?;
        if win_hold <= 0.0 {
            return None;
        }
        let ratio = loss_hold / win_hold;
        let severity = if ratio > self.hold_ratio_high {
            Severity::High
        } else if ratio > self.hold_ratio {
            Severity::Medium
        } else {
            return None;
        };
        Some(BiasFinding {
            kind: BiasKind::LossAversion,
            severity,
            detail: format!("losers held {ratio:.1}x longer than winners"),
        })
    }

    fn overconfidence(&self, trades: &[TradeOutcome], window: &[TradeOutcome]) -> Option<BiasFinding> {
        let overall = avg_by(trades, |t| t.conviction)?;
        let latest = avg_by(window, |t| t.conviction)?;
        if overall <= 0.0 || latest <= overall * self.conviction_rise {
            return None;
        }
        let wins = window.iter().filter(|t| t.is_win()).count();
        let severity = if wins >= self.streak_high {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(BiasFinding {
            kind: BiasKind::Overconfidence,
            severity,
            detail: format!("conviction {latest:.1} vs {overall:.1} overall"),
        })
    }

    fn herd(&self, window: &[TradeOutcome]) -> Option<BiasFinding> {
        if window.is_empty() {
            return None;
        }
        let low = window.iter().filter(|t| t.conviction < self.low_conviction).count();
        let share = low as f64 / window.len() as f64;
        if share < self.herd_share {
            return None;
        }
        Some(BiasFinding {
            kind: BiasKind::Herd,
            severity: Severity::Medium,
            detail: format!("{low} of {} recent trades taken with low conviction", window.len()),
        })
    }

    /// Score starts at the factor maximum and loses 1 / 2 / 3 per low /
    /// medium / high finding.
    pub fn analyze(&self, trades: Option<&[TradeOutcome]>) -> BiasReport {
        let trades = trades.unwrap_or(&[]);
        if trades.len() < self.min_history.max(1) {
            return BiasReport {
                findings: Vec::new(),
                alert: false,
                score: SubScore::neutral(Factor::Bias),
            };
        }

        let window = recent(trades, self.recent.get());
        let findings: Vec<BiasFinding> = [
            self.recency(window),
            self.loss_aversion(trades),
            self.overconfidence(trades, window),
            self.herd(window),
        ]
        .into_iter()
        .flatten()
        .collect();

        let penalty: f64 = findings.iter().map(|f| f.severity.penalty()).sum();
        BiasReport {
            alert: findings.iter().any(|f| f.severity == Severity::High),
            score: SubScore::new(Factor::Bias, Factor::Bias.max() - penalty, Direction::Neutral),
            findings,
        }
    }
}

// ============================================================
// EMOTIONAL STATE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    Optimal,
    Good,
    Caution,
    StopTrading,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmotionReport {
    /// 0..=10 each
    pub stress: f64,
    pub fomo: f64,
    pub fear: f64,
    /// None below `min_history`
    pub state: Option<EmotionalState>,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EmotionalStateAnalyzer {
    pub min_history: usize,
    pub recent: Period,
    /// Stress added per consecutive trailing loss
    pub stress_per_loss: f64,
    /// Trades shorter than this count as rushed
    pub rushed_secs: f64,
    /// Fear per unit of relative conviction drop
    pub fear_scale: f64,
    pub stop_level: f64,
    pub caution_level: f64,
    pub good_level: f64,
}

impl Default for EmotionalStateAnalyzer {
    fn default() -> Self {
        Self {
            min_history: 3,
            recent: Period::new_const(10),
            stress_per_loss: 2.0,
            rushed_secs: 300.0,
            fear_scale: 20.0,
            stop_level: 7.0,
            caution_level: 5.0,
            good_level: 3.0,
        }
    }
}

impl EmotionalStateAnalyzer {
    pub fn state(&self, stress: f64, fomo: f64, fear: f64) -> EmotionalState {
        let worst = stress.max(fomo).max(fear);
        if worst > self.stop_level {
            EmotionalState::StopTrading
        } else if worst > self.caution_level {
            EmotionalState::Caution
        } else if worst > self.good_level {
            EmotionalState::Good
        } else {
            EmotionalState::Optimal
        }
    }

    pub fn analyze(&self, trades: Option<&[TradeOutcome]>) -> EmotionReport {
        let trades = trades.unwrap_or(&[]);
        if trades.len() < self.min_history.max(1) {
            return EmotionReport {
                stress: 0.0,
                fomo: 0.0,
                fear: 0.0,
                state: None,
                score: SubScore::neutral(Factor::Emotional),
            };
        }
        let window = recent(trades, self.recent.get());

        let streak = trades.iter().rev().take_while(|t| t.is_loss()).count();
        let stress = (streak as f64 * self.stress_per_loss).min(10.0);

        let rushed = window.iter().filter(|t| t.duration_secs < self.rushed_secs).count();
        let fomo = rushed as f64 / window.len() as f64 * 10.0;

        let overall = avg_by(trades, |t| t.conviction).unwrap_or(0.0);
        let latest = avg_by(window, |t| t.conviction).unwrap_or(overall);
        let fear = if overall > 0.0 {
            ((overall - latest) / overall * self.fear_scale).clamp(0.0, 10.0)
        } else {
            0.0
        };

        let negative = (stress + fomo + fear) / 3.0;
        let max = Factor::Emotional.max();
        let value = max - negative * max / 10.0;

        EmotionReport {
            stress,
            fomo,
            fear,
            state: Some(self.state(stress, fomo, fear)),
            score: SubScore::new(Factor::Emotional, value, Direction::Neutral),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win(duration: f64, conviction: f64) -> TradeOutcome {
        TradeOutcome::new(TradeResult::Win, duration, conviction)
    }

    fn loss(duration: f64, conviction: f64) -> TradeOutcome {
        TradeOutcome::new(TradeResult::Loss, duration, conviction)
    }

    #[test]
    fn short_history_is_neutral() {
        let trades = vec![win(600.0, 6.0); 2];
        let bias = BiasDetector::default().analyze(Some(&trades));
        assert!(bias.findings.is_empty());
        assert_eq!(bias.score.value, 0.0);
        let emotion = EmotionalStateAnalyzer::default().analyze(Some(&trades));
        assert!(emotion.state.is_none());
        assert_eq!(emotion.score.value, 0.0);
        assert_eq!(EmotionalStateAnalyzer::default().analyze(None).score.value, 0.0);
    }

    #[test]
    fn balanced_history_has_no_bias() {
        let trades = vec![
            win(3_600.0, 6.0),
            loss(3_000.0, 6.0),
            win(3_600.0, 6.0),
            loss(3_600.0, 6.0),
            win(3_000.0, 6.0),
        ];
        let report = BiasDetector::default().analyze(Some(&trades));
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert_eq!(report.score.value, 8.0);
        assert!(report.score.signal.is_neutral());
    }

    #[test]
    fn losers_held_long_is_loss_aversion() {
        let trades = vec![
            win(1_000.0, 6.0),
            loss(3_000.0, 6.0),
            win(1_000.0, 6.0),
            loss(3_000.0, 6.0),
            win(1_000.0, 6.0),
        ];
        let report = BiasDetector::default().analyze(Some(&trades));
        let finding = report
            .findings
            .iter()
            .find(|f| f.kind == BiasKind::LossAversion)
            .unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert!(report.alert);
        assert_eq!(report.score.value, 5.0);
    }

    #[test]
    fn hot_streak_with_rising_conviction() {
        let mut trades = vec![loss(600.0, 5.0), win(600.0, 5.0), loss(600.0, 5.0)];
        trades.extend(std::iter::repeat(win(600.0, 10.0)).take(5));
        let report = BiasDetector::default().analyze(Some(&trades));
        let kinds: Vec<BiasKind> = report.findings.iter().map(|f| f.kind).collect();
        assert!(kinds.contains(&BiasKind::Recency));
        assert!(kinds.contains(&BiasKind::Overconfidence));
        // recency medium (5/5) + overconfidence medium
        assert_eq!(report.score.value, 4.0);
    }

    #[test]
    fn low_conviction_trades_flag_herding() {
        let trades = vec![
            win(3_600.0, 2.0),
            loss(3_600.0, 3.0),
            win(3_600.0, 2.0),
            loss(3_600.0, 6.0),
            win(3_600.0, 3.0),
        ];
        let report = BiasDetector::default().analyze(Some(&trades));
        assert!(report.findings.iter().any(|f| f.kind == BiasKind::Herd));
    }

    #[test]
    fn calm_trader_is_optimal() {
        let trades = vec![win(3_600.0, 6.0), loss(3_600.0, 6.0), win(3_600.0, 6.0)];
        let report = EmotionalStateAnalyzer::default().analyze(Some(&trades));
        assert_eq!(report.state, Some(EmotionalState::Optimal));
        assert_eq!(report.score.value, 7.0);
        assert!(report.score.signal.is_neutral());
    }

    #[test]
    fn losing_streak_of_rushed_trades() {
        let trades = vec![
            win(3_600.0, 8.0),
            win(3_600.0, 8.0),
            loss(60.0, 4.0),
            loss(60.0, 4.0),
            loss(60.0, 4.0),
            loss(60.0, 4.0),
        ];
        let report = EmotionalStateAnalyzer::default().analyze(Some(&trades));
        assert_eq!(report.stress, 8.0);
        // 4 of 6 rushed
        assert!((report.fomo - 40.0 / 6.0).abs() < 1e-9);
        assert_eq!(report.state, Some(EmotionalState::StopTrading));
        assert!(report.score.value < 7.0);
    }

    #[test]
    fn state_thresholds() {
        let a = EmotionalStateAnalyzer::default();
        assert_eq!(a.state(3.0, 0.0, 0.0), EmotionalState::Optimal);
        assert_eq!(a.state(3.5, 0.0, 0.0), EmotionalState::Good);
        assert_eq!(a.state(0.0, 6.0, 0.0), EmotionalState::Caution);
        assert_eq!(a.state(0.0, 0.0, 7.5), EmotionalState::StopTrading);
    }
}
