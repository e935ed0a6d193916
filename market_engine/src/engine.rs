//! The market engine: owns the universe, drives the tick loop and fans out updates.
//!
//! One background thread (`market-feed`) runs the loop. Each iteration performs a tick,
//! then waits a jittered delay on a crossbeam `select!` that also listens to the stop
//! channel, so `stop()` interrupts the wait immediately instead of after it.
//!
//! A tick is:
//! 1. advance the registry with the price feed and copy it into a `MarketSnapshot`
//!    (under the market lock, so the copy is never half-updated);
//! 2. evaluate the alert book against that snapshot (under the alert lock);
//! 3. hand the snapshot and alerts to every subscriber, with no engine lock held.
//!
//! Ticks are serialised by a gate mutex held for the whole tick, including fan-out, so
//! manual `tick()` calls and the background loop never overlap. Rule and subscription
//! changes only contend for the short-lived inner locks.
//!
//! `stop()` from inside a subscriber cannot join the loop: the dispatching thread holds
//! the gate, and the loop may be waiting on it. It signals instead, and the worker stays
//! registered as stopping until its thread exits. The loop checks the signal under the
//! gate, so a tick queued behind the dispatching one is never run.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select};
use log::{debug, error, info, warn};
use market_common::{
    AlertEvent, MarketSnapshot, MarketSummary, Result, TickerSpec, TickerState,
};
use strum_macros::Display;

use crate::analytics;
use crate::config::EngineConfig;
use crate::lock;
use crate::model::alert_book::{AlertBook, AlertRule};
use crate::model::price_feed::PriceFeed;
use crate::model::registry::TickerRegistry;
use crate::random::RandomSource;
use crate::subscription::{
    Callback, SubscriberRegistry, Subscription, TickUpdate, channel_callback, dispatch,
};

/// Name given to the background tick thread.
pub const FEED_THREAD_NAME: &str = "market-feed";

/// Lifecycle of the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EngineState {
    /// No loop is running.
    Idle,
    /// The background loop is ticking.
    Running,
}

struct MarketState {
    registry: TickerRegistry,
    feed: PriceFeed,
    rng: Box<dyn RandomSource>,
}

struct Shared {
    config: EngineConfig,
    tick_gate: Mutex<()>,
    market: Mutex<MarketState>,
    alerts: Mutex<AlertBook>,
    subscribers: Arc<Mutex<SubscriberRegistry>>,
    dispatcher: Mutex<Option<ThreadId>>,
}

impl Shared {
    fn tick(&self) -> MarketSnapshot {
        let _gate = lock(&self.tick_gate);
        self.tick_gated()
    }

    /// One tick. The caller holds `tick_gate`.
    fn tick_gated(&self) -> MarketSnapshot {
        let now = Utc::now();

        let snapshot = {
            let mut market = lock(&self.market);
            let MarketState { registry, feed, rng } = &mut *market;
            feed.step(registry, rng.as_mut(), now)
        };

        let alerts = lock(&self.alerts).evaluate(&snapshot);
        for alert in &alerts {
            info!("Alert: {}", alert.describe());
        }

        let callbacks = lock(&self.subscribers).callbacks();
        *lock(&self.dispatcher) = Some(thread::current().id());
        let failures = dispatch(&callbacks, &snapshot, &alerts);
        *lock(&self.dispatcher) = None;
        debug!(
            "Tick {} published to {} subscribers ({} alerts, {} failed)",
            snapshot.sequence(),
            callbacks.len(),
            alerts.len(),
            failures
        );
        snapshot
    }

    /// True while the calling thread is running subscriber callbacks.
    fn dispatching_here(&self) -> bool {
        *lock(&self.dispatcher) == Some(thread::current().id())
    }

    fn next_delay(&self) -> Duration {
        lock(&self.market)
            .rng
            .jitter(self.config.min_delay, self.config.max_delay)
    }
}

struct Worker {
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    handle: JoinHandle<()>,
    stopping: bool,
}

impl Worker {
    fn join(self) {
        if self.handle.join().is_err() {
            error!("Market feed thread panicked");
        }
    }
}

fn run_loop(shared: Arc<Shared>, stop_rx: Receiver<()>) {
    info!(
        "Market feed started (Thread ID: {:?})",
        thread::current().id()
    );
    loop {
        {
            let _gate = lock(&shared.tick_gate);
            match stop_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }
            shared.tick_gated();
        }

        let delay = shared.next_delay();
        select! {
            recv(stop_rx) -> _ => break,
            default(delay) => {}
        }
    }
    info!("Market feed loop exited");
}

/// Simulated market-data engine.
///
/// Construct it with a universe and a [`RandomSource`], then either call
/// [`Engine::start`] to tick in the background or [`Engine::tick`] to step manually.
/// Dropping the engine stops the loop and releases every subscription.
pub struct Engine {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl Engine {
    /// Build an engine ticking every `min_delay..=max_delay`.
    pub fn new(
        universe: &[TickerSpec],
        min_delay: Duration,
        max_delay: Duration,
        rng: impl RandomSource + 'static,
    ) -> Result<Self> {
        Self::with_config(universe, EngineConfig::new(min_delay, max_delay), rng)
    }

    /// Build an engine from a full [`EngineConfig`].
    ///
    /// Fails with `InvalidConfig` for an empty universe, a bad spec, or an inverted
    /// delay window.
    pub fn with_config(
        universe: &[TickerSpec],
        config: EngineConfig,
        rng: impl RandomSource + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let mut rng: Box<dyn RandomSource> = Box::new(rng);
        let registry = TickerRegistry::initialize(universe, rng.as_mut(), Utc::now())?;
        info!(
            "Engine created with {} tickers, tick window {:?}..{:?}",
            registry.len(),
            config.min_delay,
            config.max_delay
        );

        let alerts = AlertBook::new(config.movement_alert_pct);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                tick_gate: Mutex::new(()),
                market: Mutex::new(MarketState {
                    registry,
                    feed: PriceFeed,
                    rng,
                }),
                alerts: Mutex::new(alerts),
                subscribers: Arc::new(Mutex::new(SubscriberRegistry::default())),
                dispatcher: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Start the background loop. A no-op if it is already running.
    ///
    /// A stop requested from a subscriber that the loop has not acted on yet is
    /// withdrawn, and the same loop keeps running.
    pub fn start(&self) -> Result<()> {
        let mut slot = lock(&self.worker);
        if let Some(worker) = slot.as_mut() {
            if !worker.handle.is_finished() {
                if !worker.stopping {
                    debug!("Engine already running");
                    return Ok(());
                }
                if worker.stop_rx.try_recv().is_ok() {
                    worker.stopping = false;
                    info!("Pending stop withdrawn, market feed keeps running");
                    return Ok(());
                }
            }
        }
        // The loop has taken the stop signal and exits without the gate.
        if let Some(previous) = slot.take() {
            previous.join();
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let loop_rx = stop_rx.clone();
        let handle = thread::Builder::new()
            .name(FEED_THREAD_NAME.to_string())
            .spawn(move || run_loop(shared, loop_rx))?;
        *slot = Some(Worker {
            stop_tx,
            stop_rx,
            handle,
            stopping: false,
        });
        Ok(())
    }

    /// Halt the loop. A tick in flight finishes before this returns. A no-op when idle.
    ///
    /// From a subscriber callback the loop is signalled but not joined: the engine
    /// reports `Running` until the current tick is published and the loop exits.
    pub fn stop(&self) {
        let mut slot = lock(&self.worker);
        let Some(worker) = slot.as_mut() else {
            debug!("Engine already idle");
            return;
        };

        if !worker.stopping {
            let _ = worker.stop_tx.try_send(());
            worker.stopping = true;
        }
        let on_feed_thread = worker.handle.thread().id() == thread::current().id();
        if !worker.handle.is_finished() && (on_feed_thread || self.shared.dispatching_here()) {
            warn!("stop() called from a subscriber; loop will exit after this tick");
            return;
        }

        let Some(worker) = slot.take() else {
            return;
        };
        drop(slot);
        worker.join();
        info!("Engine stopped");
    }

    /// Stop the loop and release every subscription.
    pub fn shutdown(&self) {
        self.stop();
        let mut subscribers = lock(&self.shared.subscribers);
        if !subscribers.is_empty() {
            info!("Releasing {} subscriptions", subscribers.len());
        }
        subscribers.clear();
    }

    /// Whether the background loop is running. A loop told to stop from a subscriber
    /// stays `Running` until its thread exits.
    pub fn state(&self) -> EngineState {
        match lock(&self.worker).as_ref() {
            Some(worker) if !worker.handle.is_finished() => EngineState::Running,
            _ => EngineState::Idle,
        }
    }

    /// Run exactly one tick on the calling thread and return its snapshot.
    ///
    /// Waits for any tick in progress. Must not be called from a subscriber callback.
    pub fn tick(&self) -> MarketSnapshot {
        self.shared.tick()
    }

    /// Register `callback` to receive every subsequent tick.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MarketSnapshot, &[AlertEvent]) + Send + Sync + 'static,
    {
        self.register(Arc::new(callback))
    }

    /// Receive ticks through a bounded channel instead of a callback.
    pub fn subscribe_channel(&self, capacity: usize) -> (Receiver<TickUpdate>, Subscription) {
        let (callback, rx) = channel_callback(capacity);
        (rx, self.register(callback))
    }

    fn register(&self, callback: Callback) -> Subscription {
        let id = lock(&self.shared.subscribers).add(callback);
        debug!("Subscriber {:?} added", id);
        Subscription::new(id, &self.shared.subscribers)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    /// Install or replace the alert rule for `symbol`.
    ///
    /// Fails with `NotFound` for a symbol outside the universe and with
    /// `InvalidThreshold` for a non-positive or non-finite threshold.
    pub fn set_alert_rule(
        &self,
        symbol: &str,
        above: Option<f64>,
        below: Option<f64>,
    ) -> Result<()> {
        // Lock order: rules, then market. The tick never holds both.
        let mut alerts = lock(&self.shared.alerts);
        let market = lock(&self.shared.market);
        let current = market.registry.get(symbol)?;
        alerts.set_rule(current, above, below)?;
        info!(
            "Alert rule set for {}: above={:?} below={:?}",
            symbol, above, below
        );
        Ok(())
    }

    /// Remove the rule for `symbol`, if any.
    pub fn remove_alert_rule(&self, symbol: &str) {
        if lock(&self.shared.alerts).remove_rule(symbol) {
            info!("Alert rule removed for {}", symbol);
        }
    }

    /// Current rule for `symbol`, including its edge state.
    pub fn alert_rule(&self, symbol: &str) -> Option<AlertRule> {
        lock(&self.shared.alerts).rule(symbol)
    }

    /// Point-in-time copy of every ticker.
    pub fn snapshot(&self) -> MarketSnapshot {
        lock(&self.shared.market).registry.all(Utc::now())
    }

    /// Current state of one ticker.
    pub fn ticker(&self, symbol: &str) -> Result<TickerState> {
        lock(&self.shared.market).registry.get(symbol).cloned()
    }

    /// Up to `n` tickers with the largest absolute percentage change.
    pub fn top_movers(&self, n: usize) -> Vec<TickerState> {
        analytics::top_movers(&self.snapshot(), n)
    }

    /// Mean change and trend counts over the current state.
    pub fn summary(&self) -> MarketSummary {
        analytics::summarize(&self.snapshot())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("state", &self.state())
            .finish()
    }
}
