//! Bounded random walk applied to the registry once per tick.
//!
//! For every ticker, in symbol order, the feed draws a delta uniformly from
//! `[-volatility * price, +volatility * price]`, applies it with the price floor, then
//! draws a volume increment from `[0, VOLUME_STEP_RANGE)`. Draw order is part of the
//! contract: it is what makes two identically seeded engines replay the same path.

use chrono::{DateTime, Utc};
use log::trace;
use market_common::MarketSnapshot;

use crate::model::registry::TickerRegistry;
use crate::random::RandomSource;

/// Upper bound (exclusive) of the per-tick volume increment.
pub const VOLUME_STEP_RANGE: u64 = 10_000;

/// Advances every ticker by one step of the random walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceFeed;

impl PriceFeed {
    /// Apply one tick to `registry` and return the resulting snapshot.
    pub fn step(
        &self,
        registry: &mut TickerRegistry,
        rng: &mut dyn RandomSource,
        at: DateTime<Utc>,
    ) -> MarketSnapshot {
        for ticker in registry.tickers_mut() {
            let amplitude = ticker.volatility * ticker.price;
            let delta = rng.uniform(-amplitude, amplitude);
            let traded = rng.below(VOLUME_STEP_RANGE);
            ticker.apply(delta, traded, at);
            trace!(
                "{} {:.4} -> {:.4} ({:+.3}%)",
                ticker.symbol, ticker.previous_price, ticker.price, ticker.change_percent
            );
        }
        registry.advance_sequence();
        registry.all(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};
    use market_common::quote::PRICE_FLOOR;
    use market_common::{TickerSpec, Trend};

    #[test]
    fn scripted_deltas_produce_exact_prices() {
        let universe = [TickerSpec::new("AAPL", 100.0, 0.1)];
        let mut rng = ScriptedSource::new([5.0, -3.0, 20.0]);
        let mut registry = TickerRegistry::initialize(&universe, &mut rng, Utc::now()).unwrap();

        let prices: Vec<f64> = (0..3)
            .map(|_| {
                let snapshot = PriceFeed.step(&mut registry, &mut rng, Utc::now());
                snapshot.get("AAPL").unwrap().price
            })
            .collect();

        assert_eq!(prices, vec![105.0, 102.0, 122.0]);
        assert_eq!(registry.sequence(), 3);
    }

    #[test]
    fn random_walk_respects_invariants() {
        let universe = [
            TickerSpec::new("HOT", 1.0, 1.0),
            TickerSpec::new("CALM", 50.0, 0.01),
        ];
        let mut rng = RngSource::seeded(99);
        let mut registry = TickerRegistry::initialize(&universe, &mut rng, Utc::now()).unwrap();
        let mut last_volume = registry.all(Utc::now()).iter().map(|t| t.volume).collect::<Vec<_>>();

        for _ in 0..500 {
            let snapshot = PriceFeed.step(&mut registry, &mut rng, Utc::now());
            for (ticker, last) in snapshot.iter().zip(last_volume.iter_mut()) {
                assert!(ticker.price > 0.0 && ticker.price >= PRICE_FLOOR);
                assert_eq!(
                    ticker.change_percent,
                    (ticker.price - ticker.previous_price) / ticker.previous_price * 100.0
                );
                assert_eq!(ticker.trend, Trend::classify(ticker.change_percent));
                assert!(ticker.volume >= *last);
                assert!(ticker.volume - *last < VOLUME_STEP_RANGE);
                *last = ticker.volume;
            }
        }
    }

    #[test]
    fn delta_is_bounded_by_volatility() {
        let universe = [TickerSpec::new("AAPL", 100.0, 0.1)];
        let mut rng = RngSource::seeded(5);
        let mut registry = TickerRegistry::initialize(&universe, &mut rng, Utc::now()).unwrap();

        for _ in 0..200 {
            let snapshot = PriceFeed.step(&mut registry, &mut rng, Utc::now());
            let t = snapshot.get("AAPL").unwrap();
            assert!(t.change.abs() <= t.volatility * t.previous_price + 1e-9);
        }
    }
}
