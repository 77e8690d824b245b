//! Internal event bus: `emit`/`on`/`once`/`off`, observer pattern.
//!
//! The core is single-threaded cooperative so the bus needs no locking:
//! subscribers run to completion before the next handler fires, and `emit`
//! never re-enters itself from inside a handler (handlers that want to
//! react to their own emission schedule a follow-up instead).

use std::collections::HashMap;

use super::types::{Index, Placeholder, Range, RangeId};

/// Every event name the core produces, carrying its payload.
#[derive(Clone, Debug)]
pub enum ViewportEvent {
    Scroll { position: f64 },
    VelocityChanged { velocity: f64, direction_forward: bool },
    Idle { visible_range: Range },
    RangeChanged { range: Range },
    VirtualSizeChanged { size: f64 },
    ContainerSizeChanged { size: f64 },
    ItemsRendered { mounted_count: usize },
    Rendered,
    RangeLoaded { offset: Index, limit: u64, item_count: usize, total: Option<u64> },
    RangeError { range_id: RangeId, attempts: u32, message: String },
    ItemsChanged,
    TotalItemsChanged { total: u64 },
    ScrollPositionSync { position: f64 },
    ItemSizeDetected { size: f64 },
    CollectionRangeLoaded { offset: Index, limit: u64 },
    CollectionInitialLoadComplete { select_id: Option<String> },
    CollectionItemsEvicted { keep_start: Index, keep_end: Index, count: usize },
    CollectionReset,
    PlaceholderReplaced { index: Index, placeholder: Placeholder },
}

/// Opaque handle returned by `on`/`once`, used to `off` later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    once: bool,
    callback: Box<dyn FnMut(&ViewportEvent)>,
}

/// Single-threaded observer bus. Not `Send`/`Sync` — the rest of the core
/// likewise lives entirely on the wasm32 UI thread.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    dispatching: bool,
    pending_removals: Vec<SubscriptionId>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, callback: impl FnMut(&ViewportEvent) + 'static) -> SubscriptionId {
        self.subscribe(callback, false)
    }

    pub fn once(&mut self, callback: impl FnMut(&ViewportEvent) + 'static) -> SubscriptionId {
        self.subscribe(callback, true)
    }

    fn subscribe(&mut self, callback: impl FnMut(&ViewportEvent) + 'static, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            once,
            callback: Box::new(callback),
        });
        id
    }

    pub fn off(&mut self, id: SubscriptionId) {
        if self.dispatching {
            self.pending_removals.push(id);
        } else {
            self.subscribers.retain(|s| s.id != id);
        }
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    /// `once` subscribers are removed after firing.
    pub fn emit(&mut self, event: ViewportEvent) {
        self.dispatching = true;
        let mut fired_once = Vec::new();
        for sub in self.subscribers.iter_mut() {
            (sub.callback)(&event);
            if sub.once {
                fired_once.push(sub.id);
            }
        }
        self.dispatching = false;

        for id in fired_once.into_iter().chain(self.pending_removals.drain(..)) {
            self.subscribers.retain(|s| s.id != id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Counts, by discriminant name, how many times each event fired — a small
/// test helper, not part of the public contract.
#[cfg(test)]
#[derive(Default)]
pub struct EventRecorder {
    pub counts: HashMap<&'static str, usize>,
}

#[cfg(test)]
impl EventRecorder {
    fn name(event: &ViewportEvent) -> &'static str {
        match event {
            ViewportEvent::Scroll { .. } => "scroll",
            ViewportEvent::VelocityChanged { .. } => "velocity-changed",
            ViewportEvent::Idle { .. } => "idle",
            ViewportEvent::RangeChanged { .. } => "range-changed",
            ViewportEvent::VirtualSizeChanged { .. } => "virtual-size-changed",
            ViewportEvent::ContainerSizeChanged { .. } => "container-size-changed",
            ViewportEvent::ItemsRendered { .. } => "items-rendered",
            ViewportEvent::Rendered => "rendered",
            ViewportEvent::RangeLoaded { .. } => "range-loaded",
            ViewportEvent::RangeError { .. } => "range-error",
            ViewportEvent::ItemsChanged => "items-changed",
            ViewportEvent::TotalItemsChanged { .. } => "total-items-changed",
            ViewportEvent::ScrollPositionSync { .. } => "scroll-position-sync",
            ViewportEvent::ItemSizeDetected { .. } => "item-size-detected",
            ViewportEvent::CollectionRangeLoaded { .. } => "collection:range-loaded",
            ViewportEvent::CollectionInitialLoadComplete { .. } => "collection:initial-load-complete",
            ViewportEvent::CollectionItemsEvicted { .. } => "collection:items-evicted",
            ViewportEvent::CollectionReset => "collection:reset",
            ViewportEvent::PlaceholderReplaced { .. } => "placeholder-replaced",
        }
    }

    pub fn record(&mut self, event: &ViewportEvent) {
        *self.counts.entry(Self::name(event)).or_insert(0) += 1;
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn on_receives_every_emit() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        bus.on(move |_| *seen_clone.borrow_mut() += 1);

        bus.emit(ViewportEvent::Rendered);
        bus.emit(ViewportEvent::Rendered);
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn once_fires_exactly_one_time() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        bus.once(move |_| *seen_clone.borrow_mut() += 1);

        bus.emit(ViewportEvent::Rendered);
        bus.emit(ViewportEvent::Rendered);
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn off_stops_delivery() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        let id = bus.on(move |_| *seen_clone.borrow_mut() += 1);

        bus.emit(ViewportEvent::Rendered);
        bus.off(id);
        bus.emit(ViewportEvent::Rendered);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn off_during_dispatch_is_deferred_safely() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        // A handler that unsubscribes itself mid-dispatch must not panic or
        // skip other subscribers.
        let id_cell: Rc<RefCell<Option<SubscriptionId>>> = Rc::new(RefCell::new(None));
        let id_cell_clone = id_cell.clone();
        let id = bus.on(move |_| {
            *seen_clone.borrow_mut() += 1;
            if let Some(id) = *id_cell_clone.borrow() {
                // no-op placeholder to keep closure shape consistent
                let _ = id;
            }
        });
        *id_cell.borrow_mut() = Some(id);

        bus.emit(ViewportEvent::Rendered);
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
