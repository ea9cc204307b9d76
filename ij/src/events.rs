//! Readiness notifications
//!
//! Every publication emits a `ServiceEvent` on a broadcast channel. The first
//! publication of a key is a Ready event; any later one is a Replace event.
//! Consumers attach by subscribing; the injector's own logic never listens.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceEventKind {
    /// First publication
    Ready,
    /// Overwrite of an existing value
    Replace,
    /// Reserved; no removal API exists so this is never emitted
    Remove,
}

/// A readiness notification
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEvent<V> {
    /// Configured event name for `kind`
    pub event: String,
    pub kind: ServiceEventKind,
    pub name: String,
    pub value: V,
}

/// Configured names for each event kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    pub ready: String,
    pub remove: String,
    pub replace: String,
}

impl EventNames {
    pub fn name_for(&self, kind: ServiceEventKind) -> &str {
        match kind {
            ServiceEventKind::Ready => &self.ready,
            ServiceEventKind::Replace => &self.replace,
            ServiceEventKind::Remove => &self.remove,
        }
    }
}

/// Broadcast channel for service events
pub struct EventBus<V> {
    tx: broadcast::Sender<ServiceEvent<V>>,
    names: EventNames,
}

impl<V: Clone> EventBus<V> {
    pub fn new(names: EventNames, capacity: usize) -> Self {
        debug!(capacity, ?names, "EventBus::new: called");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, names }
    }

    /// Emit an event to all subscribers
    ///
    /// Events emitted with no subscribers are dropped.
    pub fn emit(&self, kind: ServiceEventKind, name: &str, value: V) {
        let event = ServiceEvent {
            event: self.names.name_for(kind).to_string(),
            kind,
            name: name.to_string(),
            value,
        };
        debug!(event = %event.event, %name, "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent<V>> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn names() -> EventNames {
        EventNames {
            ready: "up".to_string(),
            remove: "gone".to_string(),
            replace: "swapped".to_string(),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus: EventBus<i32> = EventBus::new(names(), 8);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(ServiceEventKind::Ready, "k", 1);
    }

    #[test]
    fn test_event_carries_configured_name() {
        let bus = EventBus::new(names(), 8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(ServiceEventKind::Ready, "db", "conn1");
        bus.emit(ServiceEventKind::Replace, "db", "conn2");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.event, "up");
        assert_eq!(first.kind, ServiceEventKind::Ready);
        assert_eq!((first.name.as_str(), first.value), ("db", "conn1"));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.event, "swapped");
        assert_eq!(second.value, "conn2");

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_name_for_remove() {
        assert_eq!(names().name_for(ServiceEventKind::Remove), "gone");
    }
}
