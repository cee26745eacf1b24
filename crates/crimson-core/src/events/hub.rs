//! In-process fan-out of install events with scoped subscriptions.
//!
//! Listeners are registered through [`InstallEventHub::subscribe`], which
//! returns a [`Subscription`] guard. Dropping the guard removes the listener.
//! Registering the same listener `Arc` again shares the existing registration,
//! so a listener never receives an event twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::InstallEvent;
use crate::ports::InstallEventEmitterPort;

/// Receives install events.
///
/// Called on the emitting task. Implementations that need a specific thread
/// must marshal onward themselves and should return quickly.
pub trait InstallEventListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &InstallEvent);
}

struct Registration {
    id: u64,
    key: usize,
    refs: usize,
    listener: Arc<dyn InstallEventListener>,
}

#[derive(Default)]
struct HubInner {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn release(&self, id: u64) {
        let mut regs = self.registrations.write();
        if let Some(pos) = regs.iter().position(|r| r.id == id) {
            regs[pos].refs -= 1;
            if regs[pos].refs == 0 {
                regs.remove(pos);
                trace!(subscription = id, "Listener unsubscribed");
            }
        }
    }
}

/// Event hub shared by the manager (as emitter) and consumers (as listeners).
#[derive(Clone, Default)]
pub struct InstallEventHub {
    inner: Arc<HubInner>,
}

impl InstallEventHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` until the returned guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: Arc<dyn InstallEventListener>) -> Subscription {
        let key = Arc::as_ptr(&listener).cast::<()>().addr();
        let mut regs = self.inner.registrations.write();

        let id = if let Some(existing) = regs.iter_mut().find(|r| r.key == key) {
            existing.refs += 1;
            existing.id
        } else {
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            regs.push(Registration {
                id,
                key,
                refs: 1,
                listener,
            });
            trace!(subscription = id, "Listener subscribed");
            id
        };

        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of distinct listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.inner.registrations.read().len()
    }

    /// Deliver `event` to every listener, outside the hub's lock.
    pub fn publish(&self, event: &InstallEvent) {
        let listeners: Vec<Arc<dyn InstallEventListener>> = self
            .inner
            .registrations
            .read()
            .iter()
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in listeners {
            listener.on_event(event);
        }
    }
}

impl InstallEventEmitterPort for InstallEventHub {
    fn emit(&self, event: InstallEvent) {
        self.publish(&event);
    }
}

impl std::fmt::Debug for InstallEventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallEventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Registration handle; the listener stays subscribed while this is alive.
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<HubInner>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now (same as dropping the guard).
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::{InstallAction, InstallItem};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl InstallEventListener for Recorder {
        fn on_event(&self, event: &InstallEvent) {
            self.seen.lock().push(event.event_name());
        }
    }

    fn progress() -> InstallEvent {
        InstallEvent::progress(&InstallItem::new("Hades", InstallAction::Install, "/g"))
    }

    #[test]
    fn delivers_to_subscribed_listener() {
        let hub = InstallEventHub::new();
        let recorder = Arc::new(Recorder::default());
        let _sub = hub.subscribe(recorder.clone());

        hub.emit(InstallEvent::idle());
        hub.emit(progress());

        assert_eq!(*recorder.seen.lock(), vec!["status_changed", "progress"]);
    }

    #[test]
    fn resubscribing_same_listener_does_not_duplicate_delivery() {
        let hub = InstallEventHub::new();
        let recorder = Arc::new(Recorder::default());
        let first = hub.subscribe(recorder.clone());
        let second = hub.subscribe(recorder.clone());

        hub.emit(InstallEvent::idle());
        assert_eq!(recorder.seen.lock().len(), 1);
        assert_eq!(hub.listener_count(), 1);

        drop(first);
        hub.emit(InstallEvent::idle());
        assert_eq!(recorder.seen.lock().len(), 2);

        second.unsubscribe();
        hub.emit(InstallEvent::idle());
        assert_eq!(recorder.seen.lock().len(), 2);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn dropping_guard_unsubscribes() {
        let hub = InstallEventHub::new();
        let recorder = Arc::new(Recorder::default());
        {
            let _sub = hub.subscribe(recorder.clone());
        }
        hub.emit(InstallEvent::idle());
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn guard_outliving_hub_is_harmless() {
        let hub = InstallEventHub::new();
        let sub = hub.subscribe(Arc::new(Recorder::default()));
        drop(hub);
        drop(sub);
    }

    struct Resubscriber {
        hub: InstallEventHub,
        subs: Mutex<Vec<Subscription>>,
    }

    impl InstallEventListener for Resubscriber {
        fn on_event(&self, _event: &InstallEvent) {
            let sub = self.hub.subscribe(Arc::new(Recorder::default()));
            self.subs.lock().push(sub);
        }
    }

    #[test]
    fn listener_may_subscribe_during_delivery() {
        let hub = InstallEventHub::new();
        let listener = Arc::new(Resubscriber {
            hub: hub.clone(),
            subs: Mutex::new(Vec::new()),
        });
        let _sub = hub.subscribe(listener.clone());

        hub.emit(InstallEvent::idle());
        assert_eq!(hub.listener_count(), 2);
    }
}
