//! Subscriber bookkeeping and fan-out.
//!
//! Callbacks are stored in registration order. Publishing never holds the registry
//! lock while user code runs: the tick loop takes a cheap clone of the callback list
//! and then invokes each entry, so a callback may subscribe, unsubscribe or query the
//! engine without deadlocking. A panicking callback is caught and logged; the remaining
//! subscribers and later ticks are unaffected.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use crossbeam_channel::{Receiver, TrySendError, bounded};
use log::{debug, error, warn};
use market_common::{AlertEvent, MarketSnapshot};

use crate::lock;

/// Subscriber callback: the tick's snapshot and the alerts it raised.
pub type Callback = Arc<dyn Fn(&MarketSnapshot, &[AlertEvent]) + Send + Sync>;

/// Identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// One tick's worth of data, as delivered to channel subscribers.
#[derive(Debug, Clone)]
pub struct TickUpdate {
    /// Snapshot published by the tick.
    pub snapshot: MarketSnapshot,
    /// Alerts raised by the tick, possibly empty.
    pub alerts: Vec<AlertEvent>,
}

/// Ordered list of live callbacks.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: u64,
    entries: Vec<(SubscriberId, Callback)>,
}

impl SubscriberRegistry {
    /// Register `callback` at the end of the list.
    pub fn add(&mut self, callback: Callback) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Drop a registration; returns whether it was present.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone of the callback list, in registration order.
    pub fn callbacks(&self) -> Vec<(SubscriberId, Callback)> {
        self.entries.clone()
    }
}

/// Invoke every callback with the same snapshot and alerts, isolating panics.
///
/// Returns the number of callbacks that panicked.
pub fn dispatch(
    callbacks: &[(SubscriberId, Callback)],
    snapshot: &MarketSnapshot,
    alerts: &[AlertEvent],
) -> usize {
    let mut failures = 0;
    for (id, callback) in callbacks {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot, alerts)));
        if let Err(payload) = outcome {
            failures += 1;
            error!(
                "Subscriber {:?} panicked on tick {}: {}",
                id,
                snapshot.sequence(),
                panic_message(payload.as_ref())
            );
        }
    }
    failures
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Handle returned by `subscribe`; call [`Subscription::unsubscribe`] to release it.
///
/// Dropping the handle does not unsubscribe. Registrations without a handle are
/// released when the engine shuts down.
#[must_use = "keep the handle to unsubscribe later"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<Mutex<SubscriberRegistry>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, registry: &Arc<Mutex<SubscriberRegistry>>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// Identifier of this registration.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback. No further ticks will invoke it; a tick already
    /// dispatching may still complete its call.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            if lock(&registry).remove(self.id) {
                debug!("Subscriber {:?} removed", self.id);
            }
        }
    }
}

/// Build a callback that forwards each tick into a bounded channel of `capacity`.
///
/// When the receiver falls behind and the channel is full the update is dropped for
/// that receiver and a warning is logged; the tick loop never blocks on it.
pub fn channel_callback(capacity: usize) -> (Callback, Receiver<TickUpdate>) {
    let (tx, rx) = bounded::<TickUpdate>(capacity.max(1));
    let callback: Callback = Arc::new(move |snapshot: &MarketSnapshot, alerts: &[AlertEvent]| {
        let update = TickUpdate {
            snapshot: snapshot.clone(),
            alerts: alerts.to_vec(),
        };
        match tx.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => warn!(
                "Channel subscriber lagging, dropped tick {}",
                update.snapshot.sequence()
            ),
            Err(TrySendError::Disconnected(_)) => {
                debug!("Channel subscriber receiver dropped")
            }
        }
    });
    (callback, rx)
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("next_id", &self.next_id)
            .field("subscribers", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn empty_snapshot(sequence: u64) -> MarketSnapshot {
        MarketSnapshot::new(sequence, Utc::now(), BTreeMap::new())
    }

    fn boom(_: &MarketSnapshot, _: &[AlertEvent]) {
        panic!("boom");
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriberRegistry::default();
        for n in 0..3 {
            let order = Arc::clone(&order);
            registry.add(Arc::new(move |_: &MarketSnapshot, _: &[AlertEvent]| {
                order.lock().unwrap().push(n)
            }));
        }

        dispatch(&registry.callbacks(), &empty_snapshot(1), &[]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = SubscriberRegistry::default();
        registry.add(Arc::new(boom));
        let counter = Arc::clone(&calls);
        registry.add(Arc::new(move |_: &MarketSnapshot, _: &[AlertEvent]| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let failures = dispatch(&registry.callbacks(), &empty_snapshot(1), &[]);
        assert_eq!(failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_entry() {
        let registry = Arc::new(Mutex::new(SubscriberRegistry::default()));
        let noop: Callback = Arc::new(|_: &MarketSnapshot, _: &[AlertEvent]| {});
        let first = Subscription::new(registry.lock().unwrap().add(Arc::clone(&noop)), &registry);
        let second = Subscription::new(registry.lock().unwrap().add(noop), &registry);

        first.unsubscribe();
        assert_eq!(registry.lock().unwrap().len(), 1);
        assert_eq!(registry.lock().unwrap().callbacks()[0].0, second.id());
    }

    #[test]
    fn unsubscribe_after_registry_is_gone_is_harmless() {
        let registry = Arc::new(Mutex::new(SubscriberRegistry::default()));
        let id = registry
            .lock()
            .unwrap()
            .add(Arc::new(|_: &MarketSnapshot, _: &[AlertEvent]| {}));
        let subscription = Subscription::new(id, &registry);
        drop(registry);
        subscription.unsubscribe();
    }

    #[test]
    fn channel_callback_drops_when_full() {
        let (callback, rx) = channel_callback(1);
        callback(&empty_snapshot(1), &[]);
        callback(&empty_snapshot(2), &[]);

        assert_eq!(rx.try_recv().unwrap().snapshot.sequence(), 1);
        assert!(rx.try_recv().is_err());
    }
}
