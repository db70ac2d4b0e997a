//! Bounded per-instrument history carried between evaluations.
//!
//! The order-flow analyzer keeps a trailing window of bar deltas and the
//! dark-pool analyzer keeps a trailing window of dark-index readings. Both are
//! owned by an [`AnalyzerState`] that the caller passes into each evaluation,
//! so nothing is shared between instruments.

use std::collections::{HashMap, VecDeque};

/// Default number of readings kept per history
pub const DEFAULT_HISTORY: usize = 20;

/// Fixed-capacity FIFO of readings; pushing into a full buffer evicts the
/// oldest value.
///
/// Deserialized buffers go through the same bounds as [`RingBuffer::new`]:
/// capacity is at least one and only the newest `capacity` values are kept.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "StoredRing")]
pub struct RingBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

/// Wire shape of a [`RingBuffer`], trusted only after [`From`] bounds it
#[derive(serde::Deserialize)]
struct StoredRing {
    values: VecDeque<f64>,
    capacity: usize,
}

impl From<StoredRing> for RingBuffer {
    fn from(stored: StoredRing) -> Self {
        let mut ring = RingBuffer::new(stored.capacity);
        let skip = stored.values.len().saturating_sub(ring.capacity);
        ring.values.extend(stored.values.into_iter().skip(skip));
        ring
    }
}

impl RingBuffer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value`, returning the evicted reading if the buffer was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let mut evicted = None;
        while self.values.len() >= self.capacity {
            evicted = self.values.pop_front();
        }
        self.values.push_back(value);
        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = f64> + ExactSizeIterator + '_ {
        self.values.iter().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Mean of the newest `n` readings, skipping the newest `skip`
    pub fn window_mean(&self, skip: usize, n: usize) -> Option<f64> {
        let window: Vec<f64> = self.values.iter().rev().skip(skip).take(n).copied().collect();
        if window.is_empty() {
            return None;
        }
        Some(window.iter().sum::<f64>() / window.len() as f64)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

/// Trailing analyzer history for one instrument
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalyzerState {
    delta: RingBuffer,
    dix: RingBuffer,
}

impl AnalyzerState {
    pub fn new(capacity: usize) -> Self {
        Self {
            delta: RingBuffer::new(capacity),
            dix: RingBuffer::new(capacity),
        }
    }

    pub fn delta_history(&self) -> &RingBuffer {
        &self.delta
    }

    pub fn dix_history(&self) -> &RingBuffer {
        &self.dix
    }

    pub(crate) fn delta_mut(&mut self) -> &mut RingBuffer {
        &mut self.delta
    }

    pub(crate) fn dix_mut(&mut self) -> &mut RingBuffer {
        &mut self.dix
    }

    pub fn reset(&mut self) {
        self.delta.clear();
        self.dix.clear();
    }
}

/// Identity of an evaluation stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub symbol: String,
    pub timeframe: String,
}

impl StateKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

/// Analyzer states keyed by (symbol, timeframe)
#[derive(Debug, Clone)]
pub struct StateBook {
    capacity: usize,
    states: HashMap<StateKey, AnalyzerState>,
}

impl StateBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            states: HashMap::new(),
        }
    }

    /// State for the stream, created empty on first use
    pub fn state_mut(&mut self, symbol: &str, timeframe: &str) -> &mut AnalyzerState {
        let capacity = self.capacity;
        self.states
            .entry(StateKey::new(symbol, timeframe))
            .or_insert_with(|| AnalyzerState::new(capacity))
    }

    pub fn get(&self, symbol: &str, timeframe: &str) -> Option<&AnalyzerState> {
        self.states.get(&StateKey::new(symbol, timeframe))
    }

    pub fn remove(&mut self, symbol: &str, timeframe: &str) -> Option<AnalyzerState> {
        self.states.remove(&StateKey::new(symbol, timeframe))
    }

    /// Disjoint mutable borrows, one per stream, for parallel evaluation
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&StateKey, &mut AnalyzerState)> {
        self.states.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for StateBook {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.push(1.0), None);
        assert_eq!(buf.push(2.0), None);
        assert_eq!(buf.push(3.0), None);
        assert_eq!(buf.push(4.0), Some(1.0));
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn ring_buffer_zero_capacity() {
        let mut buf = RingBuffer::new(0);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.latest(), Some(2.0));
    }

    #[test]
    fn deserialized_zero_capacity_is_bounded() {
        let mut buf: RingBuffer = serde_json::from_str(r#"{"values":[],"capacity":0}"#).unwrap();
        assert_eq!(buf.capacity(), 1);
        for v in 0..50 {
            buf.push(v as f64);
        }
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.latest(), Some(49.0));
    }

    #[test]
    fn deserialized_overfull_ring_keeps_newest() {
        let buf: RingBuffer =
            serde_json::from_str(r#"{"values":[1.0,2.0,3.0,4.0,5.0],"capacity":2}"#).unwrap();
        assert_eq!(buf.iter().collect::<Vec<_>>(), vec![4.0, 5.0]);

        let json = serde_json::to_string(&buf).unwrap();
        let back: RingBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn window_mean_skips_newest() {
        let mut buf = RingBuffer::new(10);
        for v in 1..=10 {
            buf.push(v as f64);
        }
        assert_eq!(buf.window_mean(0, 5), Some(8.0));
        assert_eq!(buf.window_mean(5, 5), Some(3.0));
        assert_eq!(buf.window_mean(10, 5), None);
    }

    #[test]
    fn state_book_isolates_streams() {
        let mut book = StateBook::new(5);
        book.state_mut("AAPL", "1h").delta_mut().push(10.0);
        book.state_mut("AAPL", "1d").delta_mut().push(-3.0);
        book.state_mut("AAPL", "1h").delta_mut().push(20.0);

        assert_eq!(book.len(), 2);
        assert_eq!(book.get("AAPL", "1h").unwrap().delta_history().len(), 2);
        assert_eq!(book.get("AAPL", "1d").unwrap().delta_history().mean(), Some(-3.0));
        assert!(book.get("MSFT", "1h").is_none());
    }
}
