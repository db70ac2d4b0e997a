//! Smart-money structural detectors
//!
//! - **Gap**: three-candle fair value gaps
//! - **Order block**: last candle before a strong breakout
//! - **Structure**: BOS / CHoCH between consecutive swings
//! - **Liquidity**: sweeps of the prior window's extremes
//! - **Zone**: premium / discount position of the latest close

pub mod gap;
pub mod helpers;
pub mod liquidity;
pub mod order_block;
pub mod structure;
pub mod zone;

pub use gap::*;
pub use helpers::*;
pub use liquidity::*;
pub use order_block::*;
pub use structure::*;
pub use zone::*;

use crate::scoring::{DirectionVotes, Factor, SubScore, VoteSource};
use crate::{Direction, PatternDetector, PatternEvent, PatternKind, Result, OHLCV};

// ============================================================
// BUILTIN DETECTOR ENUM (enum dispatch)
// ============================================================

macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch over the concrete types
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternEvent> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars)),*
                }
            }

            #[inline]
            pub fn kind(&self) -> PatternKind {
                match self {
                    $(Self::$variant(d) => PatternDetector::kind(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }

        $(
            impl From<$detector> for BuiltinDetector {
                fn from(d: $detector) -> Self {
                    Self::$variant(d)
                }
            }
        )*
    };
}

define_builtin_detectors! {
    Gap(GapDetector),
    OrderBlock(OrderBlockDetector),
    Structure(StructureDetector),
    LiquiditySweep(LiquiditySweepDetector),
}

// ============================================================
// PATTERN SET
// ============================================================

/// Every event from one scan, grouped by family, in detection order
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternSet {
    pub gaps: Vec<PatternEvent>,
    pub order_blocks: Vec<PatternEvent>,
    pub structure_breaks: Vec<PatternEvent>,
    pub sweeps: Vec<PatternEvent>,
}

impl PatternSet {
    pub fn extend(&mut self, kind: PatternKind, events: Vec<PatternEvent>) {
        let bucket = match kind {
            PatternKind::Gap => &mut self.gaps,
            PatternKind::ConsolidationBreak => &mut self.order_blocks,
            PatternKind::StructureBreak => &mut self.structure_breaks,
            PatternKind::LiquiditySweep => &mut self.sweeps,
        };
        bucket.extend(events);
    }

    pub fn len(&self) -> usize {
        self.gaps.len() + self.order_blocks.len() + self.structure_breaks.len() + self.sweeps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternEvent> {
        self.gaps
            .iter()
            .chain(&self.order_blocks)
            .chain(&self.structure_breaks)
            .chain(&self.sweeps)
    }

    /// Nearest unfilled gap, optionally restricted to one direction
    pub fn nearest_gap(&self, price: f64, direction: Option<Direction>) -> Option<&PatternEvent> {
        nearest_active(&self.gaps, price, |e| direction.map_or(true, |d| e.direction == d))
    }

    /// Nearest untested order block, optionally restricted to one direction
    pub fn nearest_order_block(
        &self,
        price: f64,
        direction: Option<Direction>,
    ) -> Option<&PatternEvent> {
        nearest_active(&self.order_blocks, price, |e| {
            direction.map_or(true, |d| e.direction == d)
        })
    }

    pub fn latest_structure_break(&self) -> Option<&PatternEvent> {
        latest(&self.structure_breaks)
    }

    pub fn latest_sweep(&self) -> Option<&PatternEvent> {
        latest(&self.sweeps)
    }

    /// Structure-category sub-scores relative to the latest close.
    /// Without a close every factor falls back to neutral zero.
    pub fn subscores(&self, close: Option<f64>) -> Vec<SubScore> {
        let Some(close) = close else {
            return [
                Factor::Gap,
                Factor::OrderBlock,
                Factor::StructureBreak,
                Factor::LiquiditySweep,
            ]
            .into_iter()
            .map(SubScore::neutral)
            .collect();
        };

        let from_event = |factor: Factor, event: Option<&PatternEvent>| match event {
            Some(e) => SubScore::new(factor, e.strength, e.direction),
            None => SubScore::neutral(factor),
        };

        vec![
            from_event(Factor::Gap, self.nearest_gap(close, None)),
            from_event(Factor::OrderBlock, self.nearest_order_block(close, None)),
            from_event(Factor::StructureBreak, self.latest_structure_break()),
            from_event(Factor::LiquiditySweep, self.latest_sweep()),
        ]
    }

    /// Direction ballots: nearest active gap, nearest active order block,
    /// most recent structure break and the zone. Sweeps do not vote.
    pub fn votes(&self, close: Option<f64>, zone: Option<&ZoneReading>) -> DirectionVotes {
        let mut ballots = Vec::with_capacity(4);

        if let Some(close) = close {
            if let Some(gap) = self.nearest_gap(close, None) {
                ballots.push((VoteSource::Gap, gap.direction));
            }
            if let Some(block) = self.nearest_order_block(close, None) {
                ballots.push((VoteSource::OrderBlock, block.direction));
            }
        }
        if let Some(brk) = self.latest_structure_break() {
            ballots.push((VoteSource::StructureBreak, brk.direction));
        }
        if let Some(zone) = zone {
            ballots.push((VoteSource::Zone, zone.zone.vote()));
        }

        DirectionVotes::from_ballots(ballots)
    }
}
