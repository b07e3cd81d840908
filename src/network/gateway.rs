//! Publish Gateway
//!
//! Outbound side of the engine. The server hands every message to a
//! [`PublishGateway`] together with its [`Topic`]; what happens next (MQTT,
//! WebSocket fan-out, a log) is the gateway's business.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::trace;

use crate::network::protocol::{ServerMessage, Topic};

/// Sink for published messages.
///
/// Publishing never blocks and never fails from the caller's point of view.
pub trait PublishGateway: Send + Sync {
    /// Publish `message` on `topic`.
    fn publish(&self, topic: Topic, message: ServerMessage);
}

/// Fans messages out to any number of subscribers over a tokio broadcast
/// channel. Slow subscribers lose the oldest messages.
#[derive(Clone)]
pub struct BroadcastGateway {
    tx: broadcast::Sender<(Topic, ServerMessage)>,
}

impl BroadcastGateway {
    /// Create a gateway buffering up to `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New subscriber; only sees messages published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<(Topic, ServerMessage)> {
        self.tx.subscribe()
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl PublishGateway for BroadcastGateway {
    fn publish(&self, topic: Topic, message: ServerMessage) {
        // no subscribers is fine
        if self.tx.send((topic, message)).is_err() {
            trace!("published with no subscribers");
        }
    }
}

/// Keeps every published message in memory. Used by tests and tools.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    messages: Arc<Mutex<Vec<(Topic, ServerMessage)>>>,
}

impl RecordingGateway {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn messages(&self) -> Vec<(Topic, ServerMessage)> {
        self.lock().clone()
    }

    /// Messages published on `topic`.
    pub fn on(&self, topic: &Topic) -> Vec<ServerMessage> {
        self.lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Topic, ServerMessage)>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PublishGateway for RecordingGateway {
    fn publish(&self, topic: Topic, message: ServerMessage) {
        self.lock().push((topic, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let gateway = BroadcastGateway::new(8);
        let mut rx = gateway.subscribe();
        assert_eq!(gateway.subscriber_count(), 1);

        gateway.publish(Topic::Client("c-1".into()), ServerMessage::error("nope"));
        let (topic, msg) = rx.recv().await.unwrap();
        assert_eq!(topic, Topic::Client("c-1".into()));
        assert_eq!(msg, ServerMessage::error("nope"));
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let gateway = BroadcastGateway::new(8);
        gateway.publish(Topic::Table("t".into()), ServerMessage::error("dropped"));
    }

    #[test]
    fn test_recording_filters_by_topic() {
        let gateway = RecordingGateway::new();
        gateway.publish(Topic::Table("t".into()), ServerMessage::error("a"));
        gateway.publish(Topic::Client("c".into()), ServerMessage::error("b"));
        assert_eq!(gateway.messages().len(), 2);
        assert_eq!(gateway.on(&Topic::Client("c".into())), vec![ServerMessage::error("b")]);
        gateway.clear();
        assert!(gateway.messages().is_empty());
    }
}
