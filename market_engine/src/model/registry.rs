//! In-memory store of every instrument's live state.
//!
//! The registry is created once from the universe and then mutated only by the price
//! feed. Symbols are kept in a `BTreeMap` so iteration, and therefore the order in which
//! random draws are consumed, is the same on every run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use market_common::{FeedError, MarketSnapshot, Result, TickerSpec, TickerState};

use crate::random::RandomSource;

/// Upper bound (exclusive) of the volume counter seeded at creation.
pub const INITIAL_VOLUME_RANGE: u64 = 1_000_000;

/// Current state of every ticker in the universe.
#[derive(Debug, Clone)]
pub struct TickerRegistry {
    tickers: BTreeMap<String, TickerState>,
    sequence: u64,
}

impl TickerRegistry {
    /// Build one `TickerState` per spec, seeding each volume from `rng`.
    ///
    /// Fails with `InvalidConfig` for an empty universe, a duplicate symbol, a base
    /// price that is not positive, or a volatility outside `(0, 1]`.
    pub fn initialize(
        universe: &[TickerSpec],
        rng: &mut dyn RandomSource,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        if universe.is_empty() {
            return Err(FeedError::InvalidConfig("universe is empty".into()));
        }

        let mut tickers = BTreeMap::new();
        for spec in universe {
            validate_spec(spec)?;
            if tickers.contains_key(&spec.symbol) {
                return Err(FeedError::InvalidConfig(format!(
                    "duplicate symbol {}",
                    spec.symbol
                )));
            }
            let volume = rng.below(INITIAL_VOLUME_RANGE);
            tickers.insert(spec.symbol.clone(), TickerState::new(spec, volume, at));
        }

        Ok(Self {
            tickers,
            sequence: 0,
        })
    }

    /// Look up one ticker.
    pub fn get(&self, symbol: &str) -> Result<&TickerState> {
        self.tickers
            .get(symbol)
            .ok_or_else(|| FeedError::NotFound(symbol.to_string()))
    }

    /// True if `symbol` belongs to the universe.
    pub fn contains(&self, symbol: &str) -> bool {
        self.tickers.contains_key(symbol)
    }

    /// Deep copy of every ticker, stamped with the current tick sequence.
    pub fn all(&self, at: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot::new(self.sequence, at, self.tickers.clone())
    }

    /// Number of ticks applied so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of tickers.
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Always false for a registry built through [`TickerRegistry::initialize`].
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub(crate) fn tickers_mut(&mut self) -> impl Iterator<Item = &mut TickerState> {
        self.tickers.values_mut()
    }

    pub(crate) fn advance_sequence(&mut self) {
        self.sequence += 1;
    }
}

fn validate_spec(spec: &TickerSpec) -> Result<()> {
    if spec.symbol.trim().is_empty() {
        return Err(FeedError::InvalidConfig("empty symbol".into()));
    }
    if !spec.base_price.is_finite() || spec.base_price <= 0.0 {
        return Err(FeedError::InvalidConfig(format!(
            "{}: base price must be positive, got {}",
            spec.symbol, spec.base_price
        )));
    }
    if !(spec.volatility > 0.0 && spec.volatility <= 1.0) {
        return Err(FeedError::InvalidConfig(format!(
            "{}: volatility must be in (0, 1], got {}",
            spec.symbol, spec.volatility
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};
    use market_common::Trend;

    fn universe() -> Vec<TickerSpec> {
        vec![
            TickerSpec::new("MSFT", 250.0, 0.05),
            TickerSpec::new("AAPL", 100.0, 0.1),
        ]
    }

    #[test]
    fn initialize_creates_stable_tickers() {
        let mut rng = RngSource::seeded(3);
        let registry = TickerRegistry::initialize(&universe(), &mut rng, Utc::now()).unwrap();

        assert_eq!(registry.len(), 2);
        let aapl = registry.get("AAPL").unwrap();
        assert_eq!(aapl.price, 100.0);
        assert_eq!(aapl.trend, Trend::Stable);
        assert!(aapl.volume < INITIAL_VOLUME_RANGE);
        assert_eq!(registry.sequence(), 0);
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let mut rng = ScriptedSource::default();
        let registry = TickerRegistry::initialize(&universe(), &mut rng, Utc::now()).unwrap();

        assert!(matches!(registry.get("TSLA"), Err(FeedError::NotFound(s)) if s == "TSLA"));
    }

    #[test]
    fn all_returns_symbol_ordered_copy() {
        let mut rng = ScriptedSource::default();
        let mut registry =
            TickerRegistry::initialize(&universe(), &mut rng, Utc::now()).unwrap();
        let snapshot = registry.all(Utc::now());

        for ticker in registry.tickers_mut() {
            ticker.price = 1.0;
        }

        assert_eq!(snapshot.symbols().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(snapshot.get("AAPL").unwrap().price, 100.0);
    }

    #[test]
    fn rejects_bad_universes() {
        let mut rng = ScriptedSource::default();
        let now = Utc::now();
        let cases = [
            vec![],
            vec![TickerSpec::new("AAPL", 100.0, 0.0)],
            vec![TickerSpec::new("AAPL", 100.0, -0.2)],
            vec![TickerSpec::new("AAPL", 100.0, 1.5)],
            vec![TickerSpec::new("AAPL", 0.0, 0.1)],
            vec![
                TickerSpec::new("AAPL", 100.0, 0.1),
                TickerSpec::new("AAPL", 90.0, 0.1),
            ],
        ];

        for universe in cases {
            let result = TickerRegistry::initialize(&universe, &mut rng, now);
            assert!(
                matches!(result, Err(FeedError::InvalidConfig(_))),
                "{universe:?} should be rejected"
            );
        }
    }

    #[test]
    fn volatility_of_one_is_allowed() {
        let mut rng = ScriptedSource::default();
        let universe = [TickerSpec::new("X", 10.0, 1.0)];
        assert!(TickerRegistry::initialize(&universe, &mut rng, Utc::now()).is_ok());
    }
}
