//! Realtime delivery events.
//!
//! Events follow the "object.action" naming convention and serialize to a
//! flat JSON object. The payload is a hint, not a data channel: clients
//! re-fetch their conversation and message lists on receipt instead of
//! trusting the payload to be complete.

use chrono::Utc;
use tracing::warn;

use crate::redis_client::RedisClient;
use crate::websocket::{pubsub, ConnectionRegistry};

#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A message was persisted in a conversation the recipient belongs to.
    MessageNew {
        conversation_code: String,
        message_id: i64,
        sender_code: String,
    },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message.new",
        }
    }

    /// Serialize to the flat wire shape.
    pub fn to_payload(&self) -> String {
        match self {
            Self::MessageNew {
                conversation_code,
                message_id,
                sender_code,
            } => serde_json::json!({
                "type": self.event_type(),
                "timestamp": Utc::now().to_rfc3339(),
                "conversation_code": conversation_code,
                "message_id": message_id,
                "sender_code": sender_code,
            })
            .to_string(),
        }
    }
}

/// Fan an event out to an explicit audience, one publish per member.
///
/// Delivery runs through Redis so every instance's local sessions are
/// reached by its pub/sub listener. Fire-and-forget: a single attempt per
/// member, failures logged and swallowed, the caller never sees an error.
pub async fn notify_audience(redis: &RedisClient, audience: &[String], event: &ChatEvent) {
    let payload = event.to_payload();
    for user_code in audience {
        if let Err(e) = pubsub::publish(redis, user_code, &payload).await {
            warn!(user = %user_code, error = %e, "delivery notification failed");
        }
    }
}

/// Local-only variant used by the pub/sub listener when a publish arrives
/// from any instance (including this one).
pub async fn deliver_local(registry: &ConnectionRegistry, user_code: &str, payload: &str) {
    registry.send_to_user(user_code, payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_naming() {
        let event = ChatEvent::MessageNew {
            conversation_code: "c1".into(),
            message_id: 1,
            sender_code: "u1".into(),
        };
        assert_eq!(event.event_type(), "message.new");
    }

    #[test]
    fn test_payload_is_flat_and_typed() {
        let event = ChatEvent::MessageNew {
            conversation_code: "c1".into(),
            message_id: 42,
            sender_code: "u1".into(),
        };

        let parsed: serde_json::Value = serde_json::from_str(&event.to_payload()).unwrap();
        assert_eq!(parsed["type"], "message.new");
        assert_eq!(parsed["conversation_code"], "c1");
        assert_eq!(parsed["message_id"], 42);
        assert_eq!(parsed["sender_code"], "u1");
        assert!(parsed["timestamp"].is_string());
    }
}
