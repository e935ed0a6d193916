//! Engine state owned by the tick loop.
//!
//! This module groups the mutable pieces the scheduler drives on every tick:
//! - `registry` — `TickerRegistry`, the live state of every instrument.
//! - `price_feed` — `PriceFeed`, the bounded random walk applied per tick.
//! - `alert_book` — `AlertBook`/`AlertRule`, edge-triggered threshold alerts.

pub mod alert_book;
pub mod price_feed;
pub mod registry;
