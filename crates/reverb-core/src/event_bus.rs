use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Notification fired after each successful unary echo. Subscribers are
/// optional; nothing in the request path depends on one being attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageProcessed {
    pub original_message: String,
    pub processed_message: String,
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<MessageProcessed>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fire-and-forget. A send error only means there are no subscribers.
    pub fn publish(&self, event: MessageProcessed) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageProcessed> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(MessageProcessed {
            original_message: "hi".into(),
            processed_message: "ECHO: hi".into(),
            tags: vec!["echoed".into()],
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.original_message, "hi");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.publish(MessageProcessed {
            original_message: "hi".into(),
            processed_message: "ECHO: hi".into(),
            tags: vec![],
        });
    }
}
