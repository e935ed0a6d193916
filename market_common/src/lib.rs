//!
//! Common types shared by the market engine and its consumers.
//!
//! This crate aggregates:
//! - `error` — unified error type `FeedError` used across the workspace.
//! - `result` — handy `Result<T, FeedError>` alias.
//! - `tickers` — instrument specs, the built-in universe and the universe file parser.
//! - `quote` — per-instrument `TickerState` and its `Trend` classification.
//! - `snapshot` — immutable `MarketSnapshot` and the derived `MarketSummary`.
//! - `alert` — `AlertEvent` values emitted by the alert evaluator.
#![warn(missing_docs)]
pub mod alert;
pub mod error;
pub mod quote;
pub mod result;
pub mod snapshot;
pub mod tickers;

pub use alert::{AlertDirection, AlertEvent};
pub use error::FeedError;
pub use quote::{TickerState, Trend};
pub use result::Result;
pub use snapshot::{MarketSnapshot, MarketSummary};
pub use tickers::TickerSpec;
