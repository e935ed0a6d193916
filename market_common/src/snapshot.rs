//! Immutable point-in-time views of the market.
//!
//! A `MarketSnapshot` is produced once per tick and shared with every subscriber. The
//! ticker map sits behind an `Arc`, so cloning a snapshot is cheap and no clone can
//! observe later ticks: the engine builds a fresh map for each publication.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::quote::TickerState;

/// Copy of every ticker's state at the end of one tick, keyed and ordered by symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    sequence: u64,
    taken_at: DateTime<Utc>,
    tickers: Arc<BTreeMap<String, TickerState>>,
}

impl MarketSnapshot {
    /// Wrap a ticker map. `sequence` is the number of ticks applied so far.
    pub fn new(
        sequence: u64,
        taken_at: DateTime<Utc>,
        tickers: BTreeMap<String, TickerState>,
    ) -> Self {
        Self {
            sequence,
            taken_at,
            tickers: Arc::new(tickers),
        }
    }

    /// Number of ticks applied before this snapshot was taken.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wall-clock time the snapshot was taken.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Look up one ticker.
    pub fn get(&self, symbol: &str) -> Option<&TickerState> {
        self.tickers.get(symbol)
    }

    /// Iterate tickers in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &TickerState> {
        self.tickers.values()
    }

    /// Symbols in ascending order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tickers.keys().map(String::as_str)
    }

    /// Number of tickers.
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// True when the snapshot holds no tickers.
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Aggregate view of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketSummary {
    /// Arithmetic mean of `change_percent` over all tickers (0 when empty).
    pub average_change_percent: f64,
    /// Tickers classified `Bullish`.
    pub bullish_count: usize,
    /// Tickers classified `Bearish`.
    pub bearish_count: usize,
    /// Tickers classified `Stable`.
    pub stable_count: usize,
    /// All tickers in the snapshot.
    pub total_tickers: usize,
}
