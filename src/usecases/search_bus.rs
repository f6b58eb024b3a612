//! Page-scoped search broadcast. Typed publish/subscribe with synchronous fan-out.
//!
//! One bus per page view, handed to the producer and every consumer. Not persisted.

use crate::domain::SearchQuery;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::trace;

type Handler = Arc<dyn Fn(&SearchQuery) + Send + Sync>;

struct Subscriber {
    id: u64,
    active: Arc<AtomicBool>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Broadcast channel for the current search text. Cloning shares the same bus.
#[derive(Clone, Default)]
pub struct SearchBus {
    inner: Arc<BusInner>,
}

impl SearchBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `query` to every current subscriber before returning.
    ///
    /// Handlers run outside the subscriber lock, so they may publish or unsubscribe.
    pub fn publish(&self, query: &SearchQuery) {
        let targets: Vec<(Arc<AtomicBool>, Handler)> = self
            .inner
            .lock()
            .iter()
            .map(|s| (Arc::clone(&s.active), Arc::clone(&s.handler)))
            .collect();
        trace!(query = %query, subscribers = targets.len(), "search broadcast");
        for (active, handler) in targets {
            if active.load(Ordering::SeqCst) {
                handler(query);
            }
        }
    }

    /// Register `handler` until the returned subscription is dropped.
    pub fn subscribe(
        &self,
        handler: impl Fn(&SearchQuery) + Send + Sync + 'static,
    ) -> SearchSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        self.inner.lock().push(Subscriber {
            id,
            active: Arc::clone(&active),
            handler: Arc::new(handler),
        });
        SearchSubscription {
            bus: Arc::downgrade(&self.inner),
            id,
            active,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Live registration on a [`SearchBus`]. Dropping it detaches the handler.
pub struct SearchSubscription {
    bus: Weak<BusInner>,
    id: u64,
    active: Arc<AtomicBool>,
}

impl Drop for SearchSubscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().retain(|s| s.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(bus: &SearchBus) -> (Arc<Mutex<Vec<String>>>, SearchSubscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = bus.subscribe(move |q| sink.lock().unwrap().push(q.as_str().to_string()));
        (seen, sub)
    }

    #[test]
    fn every_subscriber_sees_every_broadcast_in_order() {
        let bus = SearchBus::new();
        let (a, _sa) = recorder(&bus);
        let (b, _sb) = recorder(&bus);

        for q in ["f", "fo", "foo"] {
            bus.publish(&SearchQuery::new(q));
        }

        assert_eq!(*a.lock().unwrap(), vec!["f", "fo", "foo"]);
        assert_eq!(*b.lock().unwrap(), vec!["f", "fo", "foo"]);
    }

    #[test]
    fn dropped_subscription_stops_receiving() {
        let bus = SearchBus::new();
        let (a, sa) = recorder(&bus);
        bus.publish(&SearchQuery::new("x"));
        drop(sa);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(&SearchQuery::new("y"));
        assert_eq!(*a.lock().unwrap(), vec!["x"]);
    }

    #[test]
    fn handler_may_unsubscribe_during_publish() {
        let bus = SearchBus::new();
        let slot: Arc<Mutex<Option<SearchSubscription>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let sub = bus.subscribe(move |_| {
            inner.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(sub);

        bus.publish(&SearchQuery::new("a"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_one_bus() {
        let bus = SearchBus::new();
        let other = bus.clone();
        let (a, _sa) = recorder(&other);
        bus.publish(&SearchQuery::new("shared"));
        assert_eq!(*a.lock().unwrap(), vec!["shared"]);
    }
}
