use futures_util::StreamExt;
use redis::AsyncCommands;

use crate::redis_client::RedisClient;
use crate::websocket::{events, ConnectionRegistry};

fn channel_for_user(user_code: &str) -> String {
    format!("user:{}", user_code)
}

pub async fn publish(redis: &RedisClient, user_code: &str, payload: &str) -> redis::RedisResult<()> {
    let mut conn = redis.connection().await;
    conn.publish::<_, _, ()>(channel_for_user(user_code), payload)
        .await
}

/// Forward per-user publishes to this instance's local sessions.
/// Pub/sub requires a dedicated connection, not the multiplexed manager.
pub async fn start_psub_listener(
    client: redis::Client,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("user:*").await?;

    tracing::info!("pub/sub listener subscribed to user channels");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let payload: String = msg.get_payload()?;
        if let Some(user_code) = channel.strip_prefix("user:") {
            events::deliver_local(&registry, user_code, &payload).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_shape() {
        assert_eq!(channel_for_user("u1"), "user:u1");
    }
}
