use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Media,
    Attachment,
}

impl MessageKind {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "media" => Some(Self::Media),
            "attachment" => Some(Self::Attachment),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Media => "media",
            Self::Attachment => "attachment",
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db())
    }
}

/// Message row. Immutable once written; the only later mutation is a hard
/// delete by its author.
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_code: String,
    pub sender_code: String,
    pub content: String,
    pub attachment_path: Option<String>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// Message shape returned by listings and the send operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: i64,
    pub conversation_code: String,
    pub sender_code: String,
    pub content: String,
    pub attachment_path: Option<String>,
    pub kind: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
}

impl Message {
    pub fn into_dto(self, sender_avatar: Option<String>) -> MessageDto {
        MessageDto {
            id: self.id,
            conversation_code: self.conversation_code,
            sender_code: self.sender_code,
            content: self.content,
            attachment_path: self.attachment_path,
            kind: self.kind,
            created_at: self.created_at.to_rfc3339(),
            sender_avatar,
        }
    }
}
