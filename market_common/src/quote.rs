//! Per-instrument market state.
//!
//! A `TickerState` is the live record of one instrument: the last price, the price
//! before the last tick, the derived change figures, a cumulative volume counter and a
//! coarse `Trend` classification. This module also owns the price arithmetic applied on
//! every tick so the invariants (`price >= PRICE_FLOOR`, exact `change_percent`) live in
//! one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::tickers::TickerSpec;

/// Lowest price a ticker can reach; prices are clamped to it after every move.
pub const PRICE_FLOOR: f64 = 0.01;

/// Percentage move beyond which a ticker is classified as bullish or bearish.
pub const TREND_THRESHOLD_PCT: f64 = 2.0;

/// Coarse classification of a ticker's latest percentage change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Trend {
    /// Change above `+TREND_THRESHOLD_PCT`.
    Bullish,
    /// Change below `-TREND_THRESHOLD_PCT`.
    Bearish,
    /// Anything in between.
    Stable,
}

impl Trend {
    /// Classify a percentage change.
    pub fn classify(change_percent: f64) -> Self {
        if change_percent > TREND_THRESHOLD_PCT {
            Trend::Bullish
        } else if change_percent < -TREND_THRESHOLD_PCT {
            Trend::Bearish
        } else {
            Trend::Stable
        }
    }
}

/// Market state for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerState {
    /// Symbol identifier.
    pub symbol: String,
    /// Current price, never below [`PRICE_FLOOR`].
    pub price: f64,
    /// Price before the last tick.
    pub previous_price: f64,
    /// `price - previous_price`.
    pub change: f64,
    /// `change / previous_price * 100`.
    pub change_percent: f64,
    /// Cumulative traded volume; never decreases.
    pub volume: u64,
    /// Relative walk amplitude, fixed at creation.
    pub volatility: f64,
    /// Classification of `change_percent`.
    pub trend: Trend,
    /// Time of the tick that produced this state.
    pub last_update: DateTime<Utc>,
}

impl TickerState {
    /// Create the initial state for `spec` with a seeded volume counter.
    pub fn new(spec: &TickerSpec, initial_volume: u64, at: DateTime<Utc>) -> Self {
        Self {
            symbol: spec.symbol.clone(),
            price: spec.base_price,
            previous_price: spec.base_price,
            change: 0.0,
            change_percent: 0.0,
            volume: initial_volume,
            volatility: spec.volatility,
            trend: Trend::Stable,
            last_update: at,
        }
    }

    /// Move the price by `delta`, add `traded` to the volume and recompute the
    /// derived fields.
    pub fn apply(&mut self, delta: f64, traded: u64, at: DateTime<Utc>) {
        let new_price = (self.price + delta).max(PRICE_FLOOR);

        self.previous_price = self.price;
        self.price = new_price;
        self.change = self.price - self.previous_price;
        self.change_percent = self.change / self.previous_price * 100.0;
        self.volume = self.volume.saturating_add(traded);
        self.trend = Trend::classify(self.change_percent);
        self.last_update = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> TickerState {
        TickerState::new(&TickerSpec::new("AAPL", 100.0, 0.1), 500, Utc::now())
    }

    #[test]
    fn new_state_is_stable_with_no_change() {
        let state = aapl();
        assert_eq!(state.price, 100.0);
        assert_eq!(state.previous_price, 100.0);
        assert_eq!(state.change_percent, 0.0);
        assert_eq!(state.trend, Trend::Stable);
    }

    #[test]
    fn apply_recomputes_change_and_trend() {
        let mut state = aapl();
        state.apply(5.0, 42, Utc::now());

        assert_eq!(state.previous_price, 100.0);
        assert_eq!(state.price, 105.0);
        assert_eq!(state.change, 5.0);
        assert_eq!(state.change_percent, 5.0);
        assert_eq!(state.volume, 542);
        assert_eq!(state.trend, Trend::Bullish);
    }

    #[test]
    fn apply_clamps_to_price_floor() {
        let mut state = aapl();
        state.apply(-250.0, 0, Utc::now());

        assert_eq!(state.price, PRICE_FLOOR);
        assert!(state.price > 0.0);
        assert_eq!(state.trend, Trend::Bearish);
    }

    #[test]
    fn trend_boundaries_are_exclusive() {
        assert_eq!(Trend::classify(2.0), Trend::Stable);
        assert_eq!(Trend::classify(-2.0), Trend::Stable);
        assert_eq!(Trend::classify(2.0001), Trend::Bullish);
        assert_eq!(Trend::classify(-2.0001), Trend::Bearish);
    }

    #[test]
    fn trend_round_trips_through_strum() {
        assert_eq!(Trend::Bullish.to_string(), "bullish");
        assert_eq!("BEARISH".parse::<Trend>().unwrap(), Trend::Bearish);
    }
}
