use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::redis_client::RedisClient;
use crate::services::attachment_store::AttachmentStore;
use crate::websocket::ConnectionRegistry;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub registry: ConnectionRegistry,
    pub redis: RedisClient,
    pub config: Arc<Config>,
    pub attachments: AttachmentStore,
}
