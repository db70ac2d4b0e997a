//! Option-chain positioning: put/call ratios, premium flow, gamma exposure,
//! max pain and unusual activity.

use crate::scoring::{Factor, SubScore};
use crate::{Direction, Ratio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Call,
    Put,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub kind: OptionKind,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub open_interest: f64,
    /// Per-contract premium
    #[serde(default)]
    pub premium: f64,
    #[serde(default)]
    pub gamma: f64,
    #[serde(default)]
    pub implied_volatility: f64,
}

impl OptionContract {
    pub fn new(kind: OptionKind, strike: f64) -> Self {
        Self {
            strike,
            kind,
            volume: 0.0,
            open_interest: 0.0,
            premium: 0.0,
            gamma: 0.0,
            implied_volatility: 0.0,
        }
    }

    pub fn with_open_interest(mut self, oi: f64) -> Self {
        self.open_interest = oi;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_premium(mut self, premium: f64) -> Self {
        self.premium = premium;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionChain {
    /// Underlying price; the latest close is used when absent
    #[serde(default)]
    pub spot: Option<f64>,
    pub contracts: Vec<OptionContract>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GammaSkew {
    Call,
    Put,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnusualActivity {
    pub strike: f64,
    pub kind: OptionKind,
    pub volume: f64,
    /// Volume / same-kind average volume
    pub volume_ratio: f64,
    /// premium × volume
    pub notional: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionsReport {
    /// Put OI / call OI, 1.0 without call OI
    pub put_call_oi: f64,
    /// Put volume / call volume, 1.0 without call volume
    pub put_call_volume: f64,
    pub call_premium: f64,
    pub put_premium: f64,
    pub net_premium: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub net_gex: f64,
    pub skew: GammaSkew,
    /// Spot when there are no candidate strikes
    pub max_pain: f64,
    /// (max_pain − spot) / spot × 100, 0 without spot
    pub max_pain_distance_pct: f64,
    pub unusual: Vec<UnusualActivity>,
    /// 0..=100 agreement of the smart-money votes
    pub confidence: f64,
    pub score: SubScore,
}

impl OptionsReport {
    fn empty(spot: f64) -> Self {
        Self {
            put_call_oi: 1.0,
            put_call_volume: 1.0,
            call_premium: 0.0,
            put_premium: 0.0,
            net_premium: 0.0,
            call_gex: 0.0,
            put_gex: 0.0,
            net_gex: 0.0,
            skew: GammaSkew::Neutral,
            max_pain: spot,
            max_pain_distance_pct: 0.0,
            unusual: Vec::new(),
            confidence: 0.0,
            score: SubScore::neutral(Factor::Options),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OptionsFlowAnalyzer {
    /// GEX of one side must exceed the other by this factor to skew
    pub skew_ratio: f64,
    pub bullish_put_call: f64,
    pub bearish_put_call: f64,
    /// |net premium| needed for a premium vote
    pub premium_threshold: f64,
    /// Volume multiple over same-kind average for unusual activity
    pub unusual_multiple: f64,
    pub max_unusual: usize,
    /// Unusual notional of one side must exceed the other by this factor
    pub unusual_premium_ratio: f64,
    /// Candidate strikes for max pain lie within spot × (1 ± band)
    pub max_pain_band: Ratio,
    /// Shares per contract for gamma exposure
    pub contract_multiplier: f64,
}

impl Default for OptionsFlowAnalyzer {
    fn default() -> Self {
        Self {
            skew_ratio: 1.2,
            bullish_put_call: 0.7,
            bearish_put_call: 1.3,
            premium_threshold: 1_000_000.0,
            unusual_multiple: 3.0,
            max_unusual: 5,
            unusual_premium_ratio: 1.5,
            max_pain_band: Ratio::new_const(0.2),
            contract_multiplier: 100.0,
        }
    }
}

impl OptionsFlowAnalyzer {
    /// Strike minimising total intrinsic value paid to holders, searched over
    /// strikes near spot. Ties pick the lowest strike.
    pub fn max_pain(&self, contracts: &[OptionContract], spot: f64) -> f64 {
        let band = self.max_pain_band.get();
        let (lo, hi) = (spot * (1.0 - band), spot * (1.0 + band));
        let mut strikes: Vec<f64> = contracts
            .iter()
            .map(|c| c.strike)
            .filter(|k| *k >= lo && *k <= hi)
            .collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();

        let pain_at = |settle: f64| -> f64 {
            contracts
                .iter()
                .map(|c| {
                    let intrinsic = match c.kind {
                        OptionKind::Call => (settle - c.strike).max(0.0),
                        OptionKind::Put => (c.strike - settle).max(0.0),
                    };
                    intrinsic * c.open_interest
                })
                .sum()
        };

        strikes
            .into_iter()
            .map(|k| (k, pain_at(k)))
            .fold(None, |best: Option<(f64, f64)>, (k, pain)| match best {
                Some((_, best_pain)) if best_pain <= pain => best,
                _ => Some((k, pain)),
            })
            .map_or(spot, |(k, _)| k)
    }

    fn unusual_activity(&self, contracts: &[OptionContract]) -> Vec<UnusualActivity> {
        let avg_volume = |kind: OptionKind| -> f64 {
            let (sum, n) = contracts
                .iter()
                .filter(|c| c.kind == kind)
                .fold((0.0, 0usize), |(s, n), c| (s + c.volume, n + 1));
            let avg = if n > 0 { sum / n as f64 } else { 0.0 };
            if avg > 0.0 {
                avg
            } else {
                1.0
            }
        };
        let (avg_call, avg_put) = (avg_volume(OptionKind::Call), avg_volume(OptionKind::Put));

        let mut unusual: Vec<UnusualActivity> = contracts
            .iter()
            .filter_map(|c| {
                let avg = match c.kind {
                    OptionKind::Call => avg_call,
                    OptionKind::Put => avg_put,
                };
                let volume_ratio = c.volume / avg;
                (volume_ratio > self.unusual_multiple).then(|| UnusualActivity {
                    strike: c.strike,
                    kind: c.kind,
                    volume: c.volume,
                    volume_ratio,
                    notional: c.premium * c.volume,
                })
            })
            .collect();
        unusual.sort_by(|a, b| b.volume_ratio.total_cmp(&a.volume_ratio));
        unusual.truncate(self.max_unusual);
        unusual
    }

    /// `fallback_spot` (usually the latest close) is used when the chain
    /// carries no spot. Absent or empty chains give the neutral report.
    pub fn analyze(&self, chain: Option<&OptionChain>, fallback_spot: Option<f64>) -> OptionsReport {
        let spot = chain
            .and_then(|c| c.spot)
            .or(fallback_spot)
            .unwrap_or(0.0);
        let Some(chain) = chain.filter(|c| !c.contracts.is_empty()) else {
            return OptionsReport::empty(spot);
        };
        let contracts = &chain.contracts;

        let sum = |kind: OptionKind, f: fn(&OptionContract) -> f64| -> f64 {
            contracts.iter().filter(|c| c.kind == kind).map(f).sum()
        };
        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 1.0 };

        let call_oi = sum(OptionKind::Call, |c| c.open_interest);
        let put_oi = sum(OptionKind::Put, |c| c.open_interest);
        let put_call_oi = ratio(put_oi, call_oi);
        let put_call_volume = ratio(
            sum(OptionKind::Put, |c| c.volume),
            sum(OptionKind::Call, |c| c.volume),
        );

        let call_premium = sum(OptionKind::Call, |c| c.premium * c.volume);
        let put_premium = sum(OptionKind::Put, |c| c.premium * c.volume);
        let net_premium = call_premium - put_premium;

        let m = self.contract_multiplier;
        let call_gex: f64 = contracts
            .iter()
            .filter(|c| c.kind == OptionKind::Call)
            .map(|c| c.gamma * c.open_interest * m)
            .sum();
        let put_gex: f64 = contracts
            .iter()
            .filter(|c| c.kind == OptionKind::Put)
            .map(|c| c.gamma * c.open_interest * m)
            .sum();
        let skew = if call_gex > put_gex * self.skew_ratio {
            GammaSkew::Call
        } else if put_gex > call_gex * self.skew_ratio {
            GammaSkew::Put
        } else {
            GammaSkew::Neutral
        };

        let max_pain = self.max_pain(contracts, spot);
        let max_pain_distance_pct = if spot > 0.0 {
            (max_pain - spot) / spot * 100.0
        } else {
            0.0
        };

        let unusual = self.unusual_activity(contracts);
        let unusual_call: f64 = unusual
            .iter()
            .filter(|u| u.kind == OptionKind::Call)
            .map(|u| u.notional)
            .sum();
        let unusual_put: f64 = unusual
            .iter()
            .filter(|u| u.kind == OptionKind::Put)
            .map(|u| u.notional)
            .sum();

        // smart-money votes
        let mut bullish = 0;
        let mut bearish = 0;
        let mut confidence: f64 = 0.0;
        if put_call_oi < self.bullish_put_call {
            bullish += 1;
            confidence += 15.0;
        } else if put_call_oi > self.bearish_put_call {
            bearish += 1;
            confidence += 15.0;
        }
        if net_premium > self.premium_threshold {
            bullish += 1;
            confidence += 20.0;
        } else if net_premium < -self.premium_threshold {
            bearish += 1;
            confidence += 20.0;
        }
        match skew {
            GammaSkew::Call => {
                bullish += 1;
                confidence += 15.0;
            }
            GammaSkew::Put => {
                bearish += 1;
                confidence += 15.0;
            }
            GammaSkew::Neutral => {}
        }
        if unusual_call > unusual_put * self.unusual_premium_ratio {
            bullish += 1;
            confidence += 25.0;
        } else if unusual_put > unusual_call * self.unusual_premium_ratio {
            bearish += 1;
            confidence += 25.0;
        }
        let signal = Direction::from_votes(bullish, bearish);

        let mut value = 0.0;
        if put_call_oi < 0.6 || put_call_oi > 1.4 {
            value += 1.0;
        }
        if put_call_oi < 0.5 || put_call_oi > 1.6 {
            value += 1.0;
        }
        if net_premium.abs() > 5_000_000.0 {
            value += 1.0;
        }
        if net_premium.abs() > 10_000_000.0 {
            value += 1.0;
        }
        if unusual.len() >= 3 {
            value += 1.0;
        }

        OptionsReport {
            put_call_oi,
            put_call_volume,
            call_premium,
            put_premium,
            net_premium,
            call_gex,
            put_gex,
            net_gex: call_gex - put_gex,
            skew,
            max_pain,
            max_pain_distance_pct,
            unusual,
            confidence: confidence.min(100.0),
            score: SubScore::new(Factor::Options, value, signal),
        }
    }
}
