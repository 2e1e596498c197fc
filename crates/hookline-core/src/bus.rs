use crate::error::Result;
use hookline_types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel carrying canonical events from the event source to any
/// number of subscribers (usually one `RuleEngine`).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event, returning the number of receivers it reached.
    pub fn publish(&self, event: Event) -> Result<usize> {
        debug!(event = %event.name, id = %event.id, "Publishing event");
        Ok(self.sender.send(event)?)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HooklineError;
    use serde_json::json;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_eventbus_publish_subscribe() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let event = Event::new("diagnostics_received", json!({"error_count": 2}));
        assert_eq!(bus.publish(event).unwrap(), 1);

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Failed to receive event");

        assert_eq!(received.name, "diagnostics_received");
        assert_eq!(received.payload["error_count"], 2);
    }

    #[tokio::test]
    async fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.publish(Event::new("server_started", json!({}))).unwrap(), 2);

        assert_eq!(rx1.recv().await.unwrap().name, "server_started");
        assert_eq!(rx2.recv().await.unwrap().name, "server_started");
    }

    #[tokio::test]
    async fn test_eventbus_no_subscribers() {
        let bus = EventBus::new(10);
        let result = bus.publish(Event::new("empty", json!({})));
        assert!(matches!(result, Err(HooklineError::EventBus(_))));
    }

    #[tokio::test]
    async fn test_eventbus_capacity_overflow() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        bus.publish(Event::new("e1", json!({"id": 1}))).unwrap();
        bus.publish(Event::new("e2", json!({"id": 2}))).unwrap();
        bus.publish(Event::new("e3", json!({"id": 3}))).unwrap();

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert_eq!(n, 1),
            _ => panic!("Expected Lagged error"),
        }

        assert_eq!(rx.recv().await.unwrap().payload["id"], 2);
        assert_eq!(rx.recv().await.unwrap().payload["id"], 3);
    }
}
