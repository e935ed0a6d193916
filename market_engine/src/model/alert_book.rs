//! Per-ticker threshold rules with edge-triggered firing.
//!
//! Each `AlertRule` remembers which side of its thresholds the price was on after the
//! previous evaluation. An `Above` alert fires only when the price moves from
//! `<= above` to `> above`; a `Below` alert only when it moves from `>= below` to
//! `< below`. A price that stays past a threshold therefore fires once, not on every
//! tick. Edge state is refreshed on every evaluation whether or not anything fired.
//!
//! The book can also carry a movement percentage; when set, every tick whose change
//! exceeds it in either direction yields a `Surge` or `Plunge` event.

use std::collections::BTreeMap;

use market_common::{AlertDirection, AlertEvent, FeedError, MarketSnapshot, Result, TickerState};
use serde::Serialize;

/// Thresholds for one symbol plus the side of each threshold last observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertRule {
    /// Fire when the price rises through this level.
    pub above: Option<f64>,
    /// Fire when the price falls through this level.
    pub below: Option<f64>,
    was_above: bool,
    was_below: bool,
}

impl AlertRule {
    /// Create a rule whose edge state reflects `current_price`, so nothing fires until
    /// the price actually crosses a threshold.
    pub fn new(above: Option<f64>, below: Option<f64>, current_price: f64) -> Result<Self> {
        for (name, value) in [("above", above), ("below", below)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(FeedError::InvalidThreshold(format!(
                        "{} threshold must be a positive price, got {}",
                        name, v
                    )));
                }
            }
        }

        let mut rule = Self {
            above,
            below,
            was_above: false,
            was_below: false,
        };
        rule.observe(current_price);
        Ok(rule)
    }

    /// True if the last observed price was above the `above` threshold.
    pub fn was_above(&self) -> bool {
        self.was_above
    }

    /// True if the last observed price was below the `below` threshold.
    pub fn was_below(&self) -> bool {
        self.was_below
    }

    /// Compare `state` with the remembered edge state, return the crossings, and
    /// remember the new side of each threshold.
    pub fn evaluate(&mut self, state: &TickerState) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        let price = state.price;

        if let Some(above) = self.above {
            if !self.was_above && price > above {
                events.push(event(state, AlertDirection::Above, above));
            }
        }
        if let Some(below) = self.below {
            if !self.was_below && price < below {
                events.push(event(state, AlertDirection::Below, below));
            }
        }

        self.observe(price);
        events
    }

    fn observe(&mut self, price: f64) {
        self.was_above = self.above.is_some_and(|above| price > above);
        self.was_below = self.below.is_some_and(|below| price < below);
    }
}

/// Rule table keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct AlertBook {
    rules: BTreeMap<String, AlertRule>,
    movement_pct: Option<f64>,
}

impl AlertBook {
    /// Empty book. `movement_pct` enables `Surge`/`Plunge` alerts.
    pub fn new(movement_pct: Option<f64>) -> Self {
        Self {
            rules: BTreeMap::new(),
            movement_pct,
        }
    }

    /// Insert or replace the rule for `current.symbol`.
    pub fn set_rule(
        &mut self,
        current: &TickerState,
        above: Option<f64>,
        below: Option<f64>,
    ) -> Result<()> {
        let rule = AlertRule::new(above, below, current.price)?;
        self.rules.insert(current.symbol.clone(), rule);
        Ok(())
    }

    /// Remove a rule; returns whether one existed.
    pub fn remove_rule(&mut self, symbol: &str) -> bool {
        self.rules.remove(symbol).is_some()
    }

    /// Current rule for `symbol`.
    pub fn rule(&self, symbol: &str) -> Option<AlertRule> {
        self.rules.get(symbol).copied()
    }

    /// Number of installed rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule is installed.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule (in symbol order) and the movement check against
    /// `snapshot`.
    pub fn evaluate(&mut self, snapshot: &MarketSnapshot) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        for (symbol, rule) in self.rules.iter_mut() {
            if let Some(state) = snapshot.get(symbol) {
                events.extend(rule.evaluate(state));
            }
        }

        if let Some(pct) = self.movement_pct {
            for state in snapshot.iter() {
                if state.change_percent > pct {
                    events.push(event(state, AlertDirection::Surge, pct));
                } else if state.change_percent < -pct {
                    events.push(event(state, AlertDirection::Plunge, pct));
                }
            }
        }

        events
    }
}

fn event(state: &TickerState, direction: AlertDirection, threshold: f64) -> AlertEvent {
    AlertEvent {
        symbol: state.symbol.clone(),
        direction,
        threshold,
        price: state.price,
        timestamp: state.last_update,
    }
}
