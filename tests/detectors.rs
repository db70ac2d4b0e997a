//! Integration tests for the structural detectors.

use std::collections::HashMap;

use confluence::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl TestBar {
    fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { o, h, l, c, v: 1000.0 }
    }

    fn with_volume(mut self, v: f64) -> Self {
        self.v = v;
        self
    }
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

/// Oscillating series: swing highs and lows every four bars, trending up
fn make_zigzag(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let phase = [0.0, 2.0, 4.0, 2.0][i % 4];
            let base = 100.0 + phase + (i / 4) as f64;
            TestBar::new(base, base + 0.5, base - 0.5, base + 0.1)
        })
        .collect()
}

fn make_sideways(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|_| TestBar::new(100.0, 102.0, 98.0, 101.0))
        .collect()
}

// ============================================================
// GAPS
// ============================================================

#[test]
fn test_bearish_gap() {
    let bars = vec![
        TestBar::new(110.0, 111.0, 108.0, 109.0),
        TestBar::new(109.0, 109.5, 101.0, 102.0),
        TestBar::new(102.0, 104.0, 100.0, 101.0),
    ];
    let events = GapDetector::default().detect(&bars);
    assert_eq!(events.len(), 1);
    let gap = events[0];
    assert_eq!(gap.direction, Direction::Bearish);
    assert_eq!((gap.top, gap.bottom), (108.0, 104.0));
    // 4 / 109 × 1000 clamps to the maximum
    assert_eq!(gap.strength, PatternKind::Gap.max_strength());
}

#[test]
fn test_gap_fill_marks_consumed() {
    let bars = vec![
        TestBar::new(98.0, 100.0, 97.0, 99.0),
        TestBar::new(99.0, 108.0, 98.5, 107.0),
        TestBar::new(107.0, 109.0, 105.0, 108.0),
        TestBar::new(108.0, 108.5, 104.0, 104.5),
    ];
    let engine = EngineBuilder::new().build().unwrap();
    let set = engine.detect_patterns(&bars);
    assert_eq!(set.gaps.len(), 1);
    assert!(set.gaps[0].consumed);
    assert!(set.nearest_gap(104.5, None).is_none());
}

#[test]
fn test_gap_edge_touch_is_not_a_fill() {
    let bars = vec![
        TestBar::new(98.0, 100.0, 97.0, 99.0),
        TestBar::new(99.0, 108.0, 98.5, 107.0),
        TestBar::new(107.0, 109.0, 105.0, 108.0),
        TestBar::new(108.0, 108.5, 105.0, 106.0),
    ];
    let engine = EngineBuilder::new().build().unwrap();
    assert!(engine.detect_patterns(&bars).gaps[0].is_active());
}

// ============================================================
// ORDER BLOCKS
// ============================================================

#[test]
fn test_bearish_order_block() {
    let bars = vec![
        TestBar::new(100.0, 101.0, 99.0, 100.5),
        TestBar::new(100.5, 100.8, 96.0, 97.0).with_volume(3_500_000.0),
    ];
    let events = OrderBlockDetector::default().detect(&bars);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Bearish);
    assert_eq!((events[0].top, events[0].bottom), (101.0, 99.0));
    assert!((events[0].strength - 3.5).abs() < 1e-12);
}

#[test]
fn test_small_move_is_not_a_breakout() {
    let bars = make_sideways(20);
    assert!(OrderBlockDetector::default().detect(&bars).is_empty());
}

// ============================================================
// STRUCTURE
// ============================================================

#[test]
fn test_rising_swings_are_bullish_bos() {
    let bars = make_zigzag(24);
    let events = StructureDetector::default().detect(&bars);
    assert!(!events.is_empty());
    let highs: Vec<&PatternEvent> = events
        .iter()
        .filter(|e| e.break_kind == Some(BreakKind::Bos) && e.direction == Direction::Bullish)
        .collect();
    assert!(!highs.is_empty());
    for e in &events {
        assert_eq!(e.top, e.bottom);
        assert!(e.start_index < e.end_index);
        assert!(e.strength >= 0.0 && e.strength <= PatternKind::StructureBreak.max_strength());
    }
}

#[test]
fn test_structure_needs_both_neighbours() {
    let bars = make_zigzag(4);
    assert!(StructureDetector::default().detect(&bars).is_empty());
}

// ============================================================
// LIQUIDITY
// ============================================================

#[test]
fn test_sweep_of_window_high() {
    let mut bars = make_sideways(20);
    bars.push(TestBar::new(101.0, 102.5, 99.0, 100.0));
    let events = LiquiditySweepDetector::default().detect(&bars);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Bearish);
    assert_eq!(events[0].sweep_side(), Some(SweepSide::BuySide));
    assert_eq!(events[0].top, 102.0);
    // 0.5 / 102 × 1000 ≈ 4.9
    assert!((events[0].strength - 0.5 / 102.0 * 1000.0).abs() < 1e-9);
}

#[test]
fn test_sweep_requires_full_window() {
    let bars = make_sideways(20);
    assert!(LiquiditySweepDetector::default().detect(&bars).is_empty());
}

// ============================================================
// PARAMETERS
// ============================================================

#[test]
fn test_with_params_overrides_defaults() {
    let mut params = HashMap::new();
    params.insert("lookback", 30.0);
    params.insert("breakout_threshold", 0.05);
    let d = OrderBlockDetector::with_params(&params).unwrap();
    assert_eq!(d.lookback.get(), 30);
    assert!((d.breakout_threshold.get() - 0.05).abs() < 1e-12);
    assert_eq!(d.volume_divisor, OrderBlockDetector::default().volume_divisor);
}

#[test]
fn test_with_params_rejects_out_of_range() {
    let mut bad = HashMap::new();
    bad.insert("lookback", 0.0);
    assert!(GapDetector::with_params(&bad).is_err());

    let mut bad = HashMap::new();
    bad.insert("breakout_threshold", 1.5);
    assert!(OrderBlockDetector::with_params(&bad).is_err());
}

#[test]
fn test_param_grids_are_non_empty() {
    for meta in GapDetector::param_meta()
        .iter()
        .chain(OrderBlockDetector::param_meta())
        .chain(StructureDetector::param_meta())
        .chain(LiquiditySweepDetector::param_meta())
    {
        let grid = meta.generate_grid();
        assert!(!grid.is_empty(), "{} has an empty grid", meta.name);
        assert_eq!(grid[0], meta.range.min);
        assert!(grid.iter().all(|v| meta.validate(*v).is_ok()), "{} grid leaves its range", meta.name);
        assert!(meta.validate(meta.default).is_ok(), "{} default invalid", meta.name);
    }
}

#[test]
fn test_pattern_names_match_kinds() {
    assert_eq!(GapDetector::pattern_name(), "SMC_FVG");
    assert_eq!(OrderBlockDetector::pattern_name(), PatternKind::ConsolidationBreak.as_str());
    assert_eq!(StructureDetector::pattern_name(), PatternKind::StructureBreak.as_str());
    assert_eq!(LiquiditySweepDetector::pattern_name(), PatternKind::LiquiditySweep.as_str());
}

// ============================================================
// ZONES
// ============================================================

#[test]
fn test_zone_on_sideways_range() {
    let bars = make_sideways(10);
    let reading = RangeZoneClassifier::default().classify(&bars).unwrap();
    assert_eq!(reading.equilibrium, 100.0);
    // close 101 is exactly at the 1% band edge
    assert_eq!(reading.zone, Zone::Equilibrium);
    assert!(RangeZoneClassifier::default().classify::<TestBar>(&[]).is_none());
}
