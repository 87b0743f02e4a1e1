//! Conversation kinds and the shapes conversations take on the wire.
//!
//! A conversation is either a two-party direct chat, implicitly created by
//! the first message between a pair of users, or an explicitly created
//! group with a display name and open-ended membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::models::message::MessageDto;
use crate::models::user::{UserProfile, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// Two participants, at most one conversation per unordered pair
    Direct,
    /// Named conversation with explicit membership
    Group,
}

impl ConversationKind {
    /// Parse kind from database string
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Self::Direct),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    /// Convert kind to database string
    pub fn to_db(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db())
    }
}

impl std::str::FromStr for ConversationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db(s).ok_or_else(|| format!("Invalid conversation kind: {}", s))
    }
}

/// Order-independent key identifying the unordered pair of users in a
/// direct conversation. Both orderings of the same pair produce the same
/// key, which backs the unique index that collapses concurrent creates.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub code: String,
    pub name: String,
    pub kind: String,
    pub avatar: String,
    pub created_by: String,
    pub pair_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Conversation entry in the caller's history listing. For direct
/// conversations the name and avatar are the peer's, not the stored row's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub code: String,
    pub name: String,
    pub kind: ConversationKind,
    pub avatar: String,
    pub last_active: DateTime<Utc>,
    pub users: Vec<UserSummary>,
    pub last_message: Option<MessageDto>,
}

/// Group shape of the info lookup; directs and unknown codes fall back to
/// a bare `UserProfile` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub is_group: bool,
    pub code: String,
    pub name: String,
    pub kind: ConversationKind,
    pub avatar: String,
    pub users: Vec<UserSummary>,
}

/// Result of the info lookup. A group code resolves to the group shape;
/// a direct conversation resolves to the peer's profile, and an unknown
/// code falls back to the contact's profile. Both carry an `is_group`
/// discriminator for the client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConversationInfo {
    Group(GroupInfo),
    Profile(UserProfile),
}
