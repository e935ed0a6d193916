//! Simulated market-data engine.
//!
//! The engine keeps a fixed universe of instruments, advances their prices with a
//! bounded random walk on a jittered background tick, evaluates edge-triggered alert
//! rules, and publishes an immutable snapshot plus the tick's alerts to every
//! subscriber.
//!
//! Building blocks:
//! - `model` — the ticker registry, the price feed and the alert book.
//! - `analytics` — top movers and the aggregate market summary.
//! - `subscription` — callback registry, panic-isolated fan-out, channel subscribers.
//! - `engine` — `Engine`, the scheduler and public surface tying it together.
//! - `random` — the injectable `RandomSource` and its `rand`-backed adapter.
//! - `config` — `EngineConfig` tick window and movement alerts.
//!
//! ```no_run
//! use std::time::Duration;
//! use market_common::TickerSpec;
//! use market_engine::{Engine, RngSource};
//!
//! let universe = vec![TickerSpec::new("AAPL", 100.0, 0.1)];
//! let engine = Engine::new(
//!     &universe,
//!     Duration::from_secs(2),
//!     Duration::from_secs(5),
//!     RngSource::from_entropy(),
//! )?;
//! engine.set_alert_rule("AAPL", Some(120.0), None)?;
//! let subscription = engine.subscribe(|snapshot, alerts| {
//!     println!("tick {}: {} alerts", snapshot.sequence(), alerts.len());
//! });
//! engine.start()?;
//! # subscription.unsubscribe();
//! # Ok::<(), market_common::FeedError>(())
//! ```
#![warn(missing_docs)]
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod analytics;
pub mod config;
pub mod engine;
pub mod model;
pub mod random;
pub mod subscription;

pub use config::EngineConfig;
pub use engine::{Engine, EngineState};
pub use model::alert_book::AlertRule;
pub use random::{RandomSource, RngSource, ScriptedSource};
pub use subscription::{Subscription, TickUpdate};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every critical section in the engine leaves its data consistent before any call
/// that could panic, so a poisoned lock still guards valid state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
