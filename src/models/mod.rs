pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{Conversation, ConversationKind, ConversationSummary};
pub use message::{Message, MessageDto, MessageKind};
pub use user::{User, UserProfile, UserSummary};

/// Avatar assigned to users and conversations that never uploaded one.
pub const DEFAULT_AVATAR: &str = "/assets/images/no_image.jpg";

/// Generate a fresh entity code: uuid v4 in simple form, 32 lowercase hex
/// characters. Used for users, conversations and stored file names.
pub fn new_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_code_shape() {
        let code = new_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(code, new_code());
    }
}
