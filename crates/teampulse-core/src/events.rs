//! Event bus.
//!
//! Minimal pub/sub with a fixed vocabulary, so the presentation cache can
//! refresh when a snapshot lands without the collector knowing anything
//! about presentation. This is a registry of typed handlers, not a message
//! broker: delivery is synchronous in the publisher's task, and handlers
//! MUST NOT block on network I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Everything that can be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A collection run sealed a snapshot.
    DataCollected {
        /// Range label of the snapshot.
        range: String,
        /// Environment of the snapshot.
        env: String,
        /// Snapshot timestamp.
        timestamp: DateTime<Utc>,
    },
    /// An operator requested a refresh for a (range, env).
    ManualRefresh {
        /// Requested range label.
        range: String,
        /// Requested environment.
        env: String,
    },
    /// Configuration was reloaded.
    ConfigChanged,
}

/// Event kinds, the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`Event::DataCollected`].
    DataCollected,
    /// See [`Event::ManualRefresh`].
    ManualRefresh,
    /// See [`Event::ConfigChanged`].
    ConfigChanged,
}

impl Event {
    /// The kind used to route this event.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DataCollected { .. } => EventKind::DataCollected,
            Self::ManualRefresh { .. } => EventKind::ManualRefresh,
            Self::ConfigChanged => EventKind::ConfigChanged,
        }
    }
}

type Handler = Box<dyn Fn(&Event) + Send + Sync>;

/// Handler registry with synchronous dispatch.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .expect("event bus lock")
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Deliver an event to every handler of its kind, in registration
    /// order, on the calling task.
    pub fn publish(&self, event: &Event) {
        let handlers = self.handlers.lock().expect("event bus lock");
        if let Some(subscribed) = handlers.get(&event.kind()) {
            for handler in subscribed {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(EventKind, usize)> = self
            .handlers
            .lock()
            .expect("event bus lock")
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn publish_reaches_matching_subscribers() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(EventKind::DataCollected, move |event| {
            if let Event::DataCollected { range, env, .. } = event {
                assert_eq!(range, "90d");
                assert_eq!(env, "prod");
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(&Event::DataCollected {
            range: "90d".into(),
            env: "prod".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_skips_other_kinds() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(EventKind::ConfigChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&Event::ManualRefresh {
            range: "90d".into(),
            env: "prod".into(),
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        bus.publish(&Event::ConfigChanged);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            bus.subscribe(EventKind::ConfigChanged, move |_| {
                order.lock().unwrap().push(tag);
            });
        }
        bus.publish(&Event::ConfigChanged);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn delivery_is_synchronous() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(EventKind::ConfigChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(&Event::ConfigChanged);
        // The handler ran before publish returned
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
