//! Stream event fan-out for UI subscribers.
//!
//! The session emits into an [`EventBridge`]; any number of UI-side
//! listeners subscribe to it. Subscribers must subscribe before starting a
//! streaming query to see its `start` event.
//!
//! Every subscriber owns an unbounded queue, so a slow reader never loses
//! events. A subscriber is forgotten once its receiver is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use llamadeck_core::{StreamEvent, StreamEventEmitter};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end handed to each subscriber.
pub type EventReceiver = mpsc::UnboundedReceiver<StreamEvent>;

/// Fan-out of stream events to every live subscriber.
#[derive(Debug, Clone, Default)]
pub struct EventBridge {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<StreamEvent>>>>,
}

impl EventBridge {
    /// Create a new bridge
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to stream events
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|tx| !tx.is_closed()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<StreamEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StreamEventEmitter for EventBridge {
    fn emit(&self, event: StreamEvent) {
        let mut subscribers = self.lock();
        if subscribers.is_empty() {
            return;
        }
        debug!(
            event = event.event_name(),
            query_id = %event.query_id(),
            "Broadcasting stream event"
        );
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamadeck_core::QueryId;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bridge = EventBridge::new();
        let mut rx = bridge.subscribe();
        assert_eq!(bridge.subscriber_count(), 1);

        let id = QueryId::new("streaming-1");
        bridge.emit(StreamEvent::Start { query_id: id.clone() });
        bridge.emit(StreamEvent::Data {
            query_id: id.clone(),
            chunk: "x".into(),
        });

        assert_eq!(rx.recv().await.unwrap().event_name(), "stream-start");
        assert_eq!(rx.recv().await.unwrap().event_name(), "stream-data");
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        EventBridge::default().emit(StreamEvent::Start {
            query_id: QueryId::new("q"),
        });
    }

    #[tokio::test]
    async fn idle_subscriber_keeps_every_event() {
        let bridge = EventBridge::new();
        let mut rx = bridge.subscribe();
        let id = QueryId::new("streaming-1");

        bridge.emit(StreamEvent::Start { query_id: id.clone() });
        for i in 0..400 {
            bridge.emit(StreamEvent::Data {
                query_id: id.clone(),
                chunk: format!("{i} "),
            });
        }
        bridge.emit(StreamEvent::End {
            query_id: id.clone(),
            full_response: String::new(),
        });

        assert!(matches!(rx.recv().await, Some(StreamEvent::Start { .. })));
        for i in 0..400 {
            match rx.recv().await {
                Some(StreamEvent::Data { chunk, .. }) => assert_eq!(chunk, format!("{i} ")),
                other => panic!("expected chunk {i}, got {other:?}"),
            }
        }
        assert!(matches!(rx.recv().await, Some(StreamEvent::End { .. })));
    }

    #[test]
    fn dropped_subscriber_is_forgotten() {
        let bridge = EventBridge::new();
        let kept = bridge.subscribe();
        drop(bridge.subscribe());
        assert_eq!(bridge.subscriber_count(), 1);

        bridge.emit(StreamEvent::Start {
            query_id: QueryId::new("q"),
        });
        assert_eq!(bridge.lock().len(), 1);
        drop(kept);
    }
}
