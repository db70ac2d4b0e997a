//! Property tests for bounds and determinism.

use confluence::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        self.v
    }
}

/// Well-formed bars around 100 with random bodies, wicks and volume
fn bars_strategy(max_len: usize) -> impl Strategy<Value = Vec<TestBar>> {
    prop::collection::vec(
        (-4.0f64..4.0, -3.0f64..3.0, 0.0f64..2.0, 0.0f64..2.0, 0.0f64..3_000_000.0),
        0..max_len,
    )
    .prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|(drift, body, up, down, v)| {
                let o = (price + drift).max(10.0);
                let c = (o + body).max(5.0);
                let bar = TestBar {
                    o,
                    h: o.max(c) + up,
                    l: (o.min(c) - down).max(1.0),
                    c,
                    v,
                };
                price = c;
                bar
            })
            .collect()
    })
}

fn category(total: f64) -> CategoryScore {
    CategoryScore {
        category: Category::Structure,
        subscores: Vec::new(),
        total,
        max: 25.0,
        signal: Direction::Neutral,
    }
}

proptest! {
    #[test]
    fn event_strength_is_bounded(bars in bars_strategy(80)) {
        let engine = EngineBuilder::new().build().unwrap();
        let set = engine.detect_patterns(&bars);
        for event in set.iter() {
            prop_assert!(event.strength >= 0.0);
            prop_assert!(event.strength <= event.kind.max_strength());
            prop_assert!(event.top >= event.bottom);
            prop_assert!(event.end_index < bars.len());
        }
    }

    #[test]
    fn subscores_and_total_are_bounded(bars in bars_strategy(60)) {
        let engine = EngineBuilder::new().build().unwrap();
        let mut state = AnalyzerState::default();
        let analysis = engine.analyze(&MarketInput::new(&bars), &mut state).unwrap();

        for c in &analysis.categories {
            prop_assert!(c.total >= 0.0 && c.total <= c.max);
            for s in &c.subscores {
                prop_assert!(s.value >= 0.0 && s.value <= s.factor.max());
            }
        }
        let total = analysis.recommendation.assessment().total_score;
        prop_assert!((0.0..=100.0).contains(&total));
    }

    #[test]
    fn evaluation_is_deterministic(bars in bars_strategy(60)) {
        let engine = EngineBuilder::new().build().unwrap();
        let mut s1 = AnalyzerState::default();
        let mut s2 = AnalyzerState::default();
        let a = engine.evaluate(&MarketInput::new(&bars), &mut s1).unwrap();
        let b = engine.evaluate(&MarketInput::new(&bars), &mut s2).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn trade_levels_are_ordered(bars in bars_strategy(60)) {
        let engine = EngineBuilder::new().build().unwrap();
        let mut state = AnalyzerState::default();
        let rec = engine.evaluate(&MarketInput::new(&bars), &mut state).unwrap();
        if let Some(signal) = rec.signal() {
            match signal.direction {
                TradeDirection::Long => {
                    prop_assert!(signal.stop_loss < signal.entry);
                    prop_assert!(signal.entry < signal.take_profit_1);
                    prop_assert!(signal.take_profit_1 < signal.take_profit_2);
                    prop_assert!(signal.take_profit_2 < signal.take_profit_3);
                }
                TradeDirection::Short => {
                    prop_assert!(signal.stop_loss > signal.entry);
                    prop_assert!(signal.entry > signal.take_profit_1);
                    prop_assert!(signal.take_profit_1 > signal.take_profit_2);
                    prop_assert!(signal.take_profit_2 > signal.take_profit_3);
                }
            }
        }
    }

    #[test]
    fn value_area_brackets_poc(
        points in prop::collection::vec((90.0f64..110.0, 1.0f64..10_000.0), 2..200),
        bins in 2usize..40,
    ) {
        let profile = VolumeProfile::from_points(&points, bins, 0.7).unwrap();
        prop_assert!(profile.value_area_share >= 0.7 - 1e-9);
        prop_assert!(profile.value_area_share <= 1.0 + 1e-9);
        prop_assert!(profile.value_area_high >= profile.poc);
        prop_assert!(profile.poc >= profile.value_area_low);
    }

    #[test]
    fn composite_is_monotonic(
        totals in prop::collection::vec(0.0f64..25.0, 5),
        idx in 0usize..5,
        bump in 0.0f64..10.0,
    ) {
        let before: Vec<CategoryScore> = totals.iter().map(|&t| category(t)).collect();
        let mut after = before.clone();
        after[idx].total += bump;

        let (lo, hi) = (composite_score(&before), composite_score(&after));
        prop_assert!(hi >= lo);
        prop_assert!((0.0..=100.0).contains(&hi));

        let grades = GradeBands::default();
        prop_assert!(grades.grade(hi).rank() >= grades.grade(lo).rank());
    }

    #[test]
    fn subscore_clamps_any_value(value in prop::num::f64::ANY) {
        let s = SubScore::new(Factor::Vwap, value, Direction::Neutral);
        prop_assert!(s.value >= 0.0 && s.value <= Factor::Vwap.max());
    }

    #[test]
    fn short_input_has_no_events(bars in bars_strategy(2)) {
        let engine = EngineBuilder::new().build().unwrap();
        prop_assert!(engine.detect_patterns(&bars).is_empty());
    }
}
