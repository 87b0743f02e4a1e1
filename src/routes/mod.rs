// Re-export route modules
pub mod auths;
pub mod conversations;
pub mod files;
pub mod groups;
pub mod messages;
pub mod users;
pub mod wsroute;
