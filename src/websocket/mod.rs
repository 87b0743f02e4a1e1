use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod pubsub;

/// Unique identifier for one WebSocket subscription, used for precise
/// cleanup when the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Registry of connected realtime sessions, keyed by user code. A user may
/// hold several connections (multiple tabs or devices); delivery reaches
/// all of them.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user. Returns the subscription id for
    /// cleanup and the receiving end the session forwards to its socket.
    pub async fn add_subscriber(&self, user_code: &str) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard
            .entry(user_code.to_string())
            .or_default()
            .push(Subscriber {
                id: subscriber_id,
                sender: tx,
            });

        tracing::debug!(
            user = user_code,
            connections = guard.get(user_code).map(|v| v.len()).unwrap_or(0),
            "subscriber registered"
        );

        (subscriber_id, rx)
    }

    /// Drop one subscription. Must run when a connection closes, or the
    /// entry leaks until the next send notices the dead channel.
    pub async fn remove_subscriber(&self, user_code: &str, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(subscribers) = guard.get_mut(user_code) {
            subscribers.retain(|s| s.id != subscriber_id);
            if subscribers.is_empty() {
                guard.remove(user_code);
            }
        }
    }

    /// Deliver a payload to every live connection of a user; dead senders
    /// are cleaned up on the way.
    pub async fn send_to_user(&self, user_code: &str, msg: &str) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(user_code) {
            subscribers.retain(|s| s.sender.send(msg.to_string()).is_ok());
            if subscribers.is_empty() {
                guard.remove(user_code);
            }
        }
    }

    pub async fn connection_count(&self, user_code: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(user_code).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_deliver() {
        let registry = ConnectionRegistry::new();
        let (_id, mut rx) = registry.add_subscriber("u1").await;

        registry.send_to_user("u1", "ping").await;
        assert_eq!(rx.recv().await.unwrap(), "ping");
    }

    #[tokio::test]
    async fn test_delivery_reaches_all_connections_of_a_user() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = registry.add_subscriber("u1").await;
        let (_b, mut rx_b) = registry.add_subscriber("u1").await;

        registry.send_to_user("u1", "hello").await;
        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_delivery_is_per_user() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = registry.add_subscriber("u1").await;
        let (_b, mut rx_b) = registry.add_subscriber("u2").await;

        registry.send_to_user("u1", "for-u1").await;
        assert_eq!(rx_a.recv().await.unwrap(), "for-u1");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_subscriber_cleans_entry() {
        let registry = ConnectionRegistry::new();
        let (id, _rx) = registry.add_subscriber("u1").await;
        assert_eq!(registry.connection_count("u1").await, 1);

        registry.remove_subscriber("u1", id).await;
        assert_eq!(registry.connection_count("u1").await, 0);
    }

    #[tokio::test]
    async fn test_dead_senders_are_pruned_on_send() {
        let registry = ConnectionRegistry::new();
        let (_id, rx) = registry.add_subscriber("u1").await;
        drop(rx);

        registry.send_to_user("u1", "anyone there").await;
        assert_eq!(registry.connection_count("u1").await, 0);
    }
}
