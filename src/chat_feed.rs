use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::models::ChatMessage;

type Subscribers = HashMap<i64, Vec<mpsc::UnboundedSender<String>>>;

/// Live chat fan-out: per event, the senders of every open WebSocket.
#[derive(Clone, Default)]
pub struct ChatFeed {
    subscribers: Arc<RwLock<Subscribers>>,
}

impl ChatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event_id: i64) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.write() {
            Ok(mut map) => map.entry(event_id).or_default().push(tx),
            Err(_) => log::error!("Chat subscriber map is poisoned, dropping subscription"),
        }
        log::debug!("New chat subscriber for event {}", event_id);
        rx
    }

    /// Pushes `message` to subscribers of its event. Returns how many
    /// subscribers it was handed to.
    pub fn publish(&self, message: &ChatMessage) -> usize {
        let payload = serde_json::json!({
            "type": "chat_message",
            "message": message,
        })
        .to_string();

        let map = match self.subscribers.read() {
            Ok(m) => m,
            Err(_) => return 0,
        };
        let Some(senders) = map.get(&message.event_id) else {
            return 0;
        };
        senders
            .iter()
            .filter(|sender| sender.send(payload.clone()).is_ok())
            .count()
    }

    /// Drops closed senders for `event_id`.
    pub fn prune(&self, event_id: i64) {
        if let Ok(mut map) = self.subscribers.write() {
            if let Some(senders) = map.get_mut(&event_id) {
                senders.retain(|s| !s.is_closed());
                if senders.is_empty() {
                    map.remove(&event_id);
                }
            }
        }
    }

    pub fn subscriber_count(&self, event_id: i64) -> usize {
        self.subscribers
            .read()
            .map(|map| map.get(&event_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(event_id: i64, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            event_id,
            volunteer_id: None,
            volunteer_name: "Organizer".to_string(),
            volunteer_email: None,
            message: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn messages_reach_only_subscribers_of_the_same_event() {
        let feed = ChatFeed::new();
        let mut first = feed.subscribe(1);
        let mut second = feed.subscribe(1);
        let mut other = feed.subscribe(2);

        assert_eq!(feed.publish(&message(1, "Meet at gate B")), 2);

        let received: serde_json::Value =
            serde_json::from_str(&first.recv().await.unwrap()).unwrap();
        assert_eq!(received["type"], "chat_message");
        assert_eq!(received["message"]["message"], "Meet at gate B");
        assert!(second.recv().await.is_some());
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let feed = ChatFeed::new();
        let kept = feed.subscribe(5);
        drop(feed.subscribe(5));
        assert_eq!(feed.subscriber_count(5), 2);

        feed.prune(5);
        assert_eq!(feed.subscriber_count(5), 1);

        drop(kept);
        feed.prune(5);
        assert_eq!(feed.subscriber_count(5), 0);
        assert_eq!(feed.publish(&message(5, "anyone?")), 0);
    }
}
