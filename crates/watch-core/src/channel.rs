use crate::error::WatchError;
use crate::events::EventEnvelope;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub type EventHandler = Arc<dyn Fn(EventEnvelope) + Send + Sync>;

/// Subscription to a stream of typed push events. Events on one subscription
/// arrive in the order the channel received them; nothing is replayed after
/// a reconnect.
pub trait EventChannel: Send + Sync {
    fn subscribe(&self, handler: EventHandler) -> Subscription;
}

/// Registration handle. Dropping it unregisters the handler.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: BTreeMap<u64, EventHandler>,
}

/// In-process event channel. `publish` hands each envelope to every
/// registered handler, synchronously and in call order.
#[derive(Clone, Default)]
pub struct LocalEventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, envelope: EventEnvelope) {
        let handlers: Vec<EventHandler> = match self.inner.lock() {
            Ok(inner) => inner.handlers.values().cloned().collect(),
            Err(_) => return,
        };
        for handler in handlers {
            handler(envelope.clone());
        }
    }

    pub fn publish_json(&self, line: &str) -> Result<(), WatchError> {
        let envelope = EventEnvelope::from_json(line)?;
        self.publish(envelope);
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.handlers.len())
            .unwrap_or_default()
    }
}

impl EventChannel for LocalEventBus {
    fn subscribe(&self, handler: EventHandler) -> Subscription {
        let id = match self.inner.lock() {
            Ok(mut inner) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.handlers.insert(id, handler);
                id
            }
            Err(_) => return Subscription { unsubscribe: None },
        };
        debug!(subscription = id, "Event subscription registered");
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            if let Ok(mut inner) = inner.lock() {
                inner.handlers.remove(&id);
            }
            debug!(subscription = id, "Event subscription removed");
        })
    }
}
