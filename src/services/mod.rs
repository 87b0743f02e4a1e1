pub mod attachment_store;
pub mod auth_service;
pub mod conversation_service;
pub mod message_service;
pub mod user_service;
