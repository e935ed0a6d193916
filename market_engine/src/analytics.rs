//! Derived views over a snapshot: top movers and the market summary.
//!
//! Both functions are pure; they read a `MarketSnapshot` and allocate their result.

use std::cmp::Ordering;

use market_common::{MarketSnapshot, MarketSummary, TickerState, Trend};

/// Up to `n` tickers ordered by `|change_percent|` descending, ties by symbol ascending.
pub fn top_movers(snapshot: &MarketSnapshot, n: usize) -> Vec<TickerState> {
    let mut movers: Vec<&TickerState> = snapshot.iter().collect();
    movers.sort_by(|a, b| {
        b.change_percent
            .abs()
            .partial_cmp(&a.change_percent.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    movers.into_iter().take(n).cloned().collect()
}

/// Mean change and trend counts across the snapshot.
pub fn summarize(snapshot: &MarketSnapshot) -> MarketSummary {
    let mut summary = MarketSummary {
        average_change_percent: 0.0,
        bullish_count: 0,
        bearish_count: 0,
        stable_count: 0,
        total_tickers: snapshot.len(),
    };
    if snapshot.is_empty() {
        return summary;
    }

    let mut total_change = 0.0;
    for ticker in snapshot.iter() {
        total_change += ticker.change_percent;
        match ticker.trend {
            Trend::Bullish => summary.bullish_count += 1,
            Trend::Bearish => summary.bearish_count += 1,
            Trend::Stable => summary.stable_count += 1,
        }
    }
    summary.average_change_percent = total_change / snapshot.len() as f64;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_common::TickerSpec;
    use std::collections::BTreeMap;

    fn snapshot(moves: &[(&str, f64)]) -> MarketSnapshot {
        let now = Utc::now();
        let map: BTreeMap<_, _> = moves
            .iter()
            .map(|(symbol, pct)| {
                let mut state = TickerState::new(&TickerSpec::new(*symbol, 100.0, 0.1), 0, now);
                state.apply(*pct, 0, now);
                (symbol.to_string(), state)
            })
            .collect();
        MarketSnapshot::new(1, now, map)
    }

    #[test]
    fn top_movers_sorts_by_absolute_change_then_symbol() {
        let snap = snapshot(&[("AAA", 1.0), ("BBB", -4.0), ("CCC", 4.0), ("DDD", 0.5)]);
        let symbols: Vec<_> = top_movers(&snap, 3).into_iter().map(|t| t.symbol).collect();

        assert_eq!(symbols, vec!["BBB", "CCC", "AAA"]);
    }

    #[test]
    fn top_movers_returns_everything_once_when_n_is_large() {
        let snap = snapshot(&[("AAA", 1.0), ("BBB", -2.0)]);
        let movers = top_movers(&snap, 10);

        assert_eq!(movers.len(), 2);
        assert_eq!(movers[0].symbol, "BBB");
        assert_eq!(movers[1].symbol, "AAA");
        assert!(top_movers(&snap, 0).is_empty());
    }

    #[test]
    fn summary_partitions_by_trend() {
        let snap = snapshot(&[("A", 3.0), ("B", -3.0), ("C", -6.0), ("D", 0.0)]);
        let summary = summarize(&snap);

        assert_eq!(summary.bullish_count, 1);
        assert_eq!(summary.bearish_count, 2);
        assert_eq!(summary.stable_count, 1);
        assert_eq!(summary.total_tickers, 4);
        assert_eq!(
            summary.bullish_count + summary.bearish_count + summary.stable_count,
            summary.total_tickers
        );
        assert!((summary.average_change_percent - (-1.5)).abs() < 1e-12);
    }

    #[test]
    fn empty_snapshot_summarizes_to_zero() {
        let summary = summarize(&MarketSnapshot::new(0, Utc::now(), BTreeMap::new()));
        assert_eq!(summary.total_tickers, 0);
        assert_eq!(summary.average_change_percent, 0.0);
    }
}
