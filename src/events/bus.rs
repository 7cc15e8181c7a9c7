//! Event bus for broadcasting diagnostic events to independent consumers

use super::{DiagnosticSink, PulseEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus that distributes PulseEvents via `tokio::sync::broadcast`
///
/// Fire-and-forget: emitting never blocks, never panics.
/// If no subscribers are connected, events are silently dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PulseEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events (e.g. an on-screen log)
    pub fn subscribe(&self) -> broadcast::Receiver<PulseEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl DiagnosticSink for EventBus {
    fn emit(&self, event: PulseEvent) {
        let kind = event.kind();
        if let Ok(n) = self.sender.send(event) {
            debug!(kind, subscribers = n, "PulseEvent emitted");
        }
        // Err: no subscribers, expected
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Vec3;

    #[test]
    fn test_emit_without_subscriber_no_panic() {
        let bus = EventBus::default();
        bus.emit(PulseEvent::generation_failed(0, "empty"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_with_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(PulseEvent::graph_built(2, "lattice", 125, 300, 1.0));

        match rx.try_recv().unwrap() {
            PulseEvent::GraphBuilt {
                formation_id,
                formation,
                nodes,
                ..
            } => {
                assert_eq!(formation_id, 2);
                assert_eq!(formation, "lattice");
                assert_eq!(nodes, 125);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_multi_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(PulseEvent::pulse_ignored(Vec3::ZERO, "no graph"));

        assert_eq!(rx1.try_recv().unwrap().kind(), "pulse_ignored");
        assert_eq!(rx2.try_recv().unwrap().kind(), "pulse_ignored");
    }

    #[test]
    fn test_dropped_subscriber_doesnt_affect_others() {
        let bus = EventBus::default();
        let rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(PulseEvent::generation_failed(4, "empty"));
        assert_eq!(rx2.try_recv().unwrap().kind(), "generation_failed");
    }

    #[test]
    fn test_clone_shares_channel() {
        let bus = EventBus::default();
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.emit(PulseEvent::generation_failed(1, "empty"));
        assert!(rx.try_recv().is_ok());
    }
}
