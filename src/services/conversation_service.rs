use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::conversation::{pair_key, ConversationInfo, GroupInfo};
use crate::models::{
    new_code, Conversation, ConversationKind, ConversationSummary, Message, User, UserSummary,
    DEFAULT_AVATAR,
};
use crate::services::attachment_store;
use crate::services::user_service::UserService;

/// Avatar uploads arrive as a data URL from the client's canvas export.
const AVATAR_DATA_PREFIX: &str = "data:image/png;base64,";

/// Where a message is headed, resolved once at the request boundary so the
/// pipeline never re-checks which optional field was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// Explicit conversation code. The direct recipient, when the request
    /// also carried one, is kept as a fallback for stale codes.
    Conversation {
        code: String,
        recipient: Option<String>,
    },
    /// Direct send addressed to a user; the conversation is found or
    /// created as needed.
    Direct(String),
}

impl SendTarget {
    /// Build from the two optional request fields. A non-empty conversation
    /// code wins; empty or whitespace strings count as absent.
    pub fn from_parts(
        conversation_code: Option<&str>,
        recipient_code: Option<&str>,
    ) -> AppResult<Self> {
        let conversation = conversation_code.map(str::trim).filter(|c| !c.is_empty());
        let recipient = recipient_code.map(str::trim).filter(|c| !c.is_empty());

        match (conversation, recipient) {
            (Some(code), recipient) => Ok(SendTarget::Conversation {
                code: code.to_string(),
                recipient: recipient.map(str::to_string),
            }),
            (None, Some(code)) => Ok(SendTarget::Direct(code.to_string())),
            (None, None) => Err(AppError::InvalidTarget),
        }
    }
}

pub struct ConversationService;

impl ConversationService {
    pub async fn get_by_code(db: &PgPool, code: &str) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(conversation)
    }

    /// Resolve the conversation a message belongs to. An explicit code is
    /// trusted as-is (no membership or kind validation); a direct target is
    /// looked up by pair and created on first contact.
    pub async fn resolve(
        db: &PgPool,
        sender_code: &str,
        target: &SendTarget,
    ) -> AppResult<Conversation> {
        match target {
            SendTarget::Conversation { code, recipient } => {
                if let Some(conversation) = Self::get_by_code(db, code).await? {
                    return Ok(conversation);
                }
                match recipient {
                    Some(recipient_code) => {
                        Self::resolve_direct(db, sender_code, recipient_code).await
                    }
                    None => Err(AppError::InvalidTarget),
                }
            }
            SendTarget::Direct(recipient_code) => {
                Self::resolve_direct(db, sender_code, recipient_code).await
            }
        }
    }

    async fn resolve_direct(
        db: &PgPool,
        sender_code: &str,
        recipient_code: &str,
    ) -> AppResult<Conversation> {
        if let Some(existing) = Self::find_direct(db, sender_code, recipient_code).await? {
            return Ok(existing);
        }

        let recipient = UserService::get_by_code(db, recipient_code)
            .await?
            .ok_or(AppError::InvalidTarget)?;

        Self::create_direct(db, sender_code, &recipient).await
    }

    /// Look up the direct conversation for an unordered pair of users.
    /// Duplicate rows can only predate the pair-key constraint; the oldest
    /// one (by creation time, then code) is the stable pick.
    pub async fn find_direct(
        db: &PgPool,
        a: &str,
        b: &str,
    ) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE pair_key = $1 ORDER BY created_at, code LIMIT 1",
        )
        .bind(pair_key(a, b))
        .fetch_optional(db)
        .await?;
        Ok(conversation)
    }

    /// Create the direct conversation for a pair, converging with any
    /// concurrent creator on the same row. Commits before returning so the
    /// caller can rely on the row being visible to its own transaction.
    pub async fn create_direct(
        db: &PgPool,
        sender_code: &str,
        recipient: &User,
    ) -> AppResult<Conversation> {
        let code = new_code();
        let key = pair_key(sender_code, &recipient.code);

        let mut tx = db.begin().await?;

        let inserted = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (code, name, kind, avatar, created_by, pair_key) \
             VALUES ($1, $2, 'direct', $3, $4, $5) \
             ON CONFLICT (pair_key) WHERE pair_key IS NOT NULL DO NOTHING \
             RETURNING *",
        )
        .bind(&code)
        .bind(&recipient.full_name)
        .bind(DEFAULT_AVATAR)
        .bind(sender_code)
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let conversation = match inserted {
            Some(conversation) => conversation,
            None => {
                // Lost the race: another sender inserted this pair first.
                tx.rollback().await?;
                return Self::find_direct(db, sender_code, &recipient.code)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database("direct conversation vanished after insert conflict".into())
                    });
            }
        };

        sqlx::query(
            "INSERT INTO conversation_members (conversation_code, user_code) \
             VALUES ($1, $2), ($1, $3) ON CONFLICT DO NOTHING",
        )
        .bind(&code)
        .bind(sender_code)
        .bind(&recipient.code)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(code = %conversation.code, "created direct conversation");
        Ok(conversation)
    }

    /// Create a group conversation. Membership is the given members plus
    /// the creator, de-duplicated, so a creator listing themselves does not
    /// appear twice.
    pub async fn create_group(
        db: &PgPool,
        creator_code: &str,
        name: &str,
        member_codes: &[String],
    ) -> AppResult<Conversation> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("group name cannot be empty".into()));
        }

        let mut all_members = vec![creator_code.to_string()];
        for member in member_codes {
            if member != creator_code && !all_members.contains(member) {
                all_members.push(member.clone());
            }
        }

        let code = new_code();
        let mut tx = db.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (code, name, kind, avatar, created_by) \
             VALUES ($1, $2, 'group', $3, $4) RETURNING *",
        )
        .bind(&code)
        .bind(name.trim())
        .bind(DEFAULT_AVATAR)
        .bind(creator_code)
        .fetch_one(&mut *tx)
        .await?;

        for member in &all_members {
            sqlx::query(
                "INSERT INTO conversation_members (conversation_code, user_code) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(&code)
            .bind(member)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(code = %conversation.code, members = all_members.len(), "created group conversation");
        Ok(conversation)
    }

    /// Update a group's display name and avatar. Avatars arrive as a
    /// base64 data URL and are written to the avatar directory; any other
    /// avatar payload leaves the stored value untouched.
    pub async fn update_group(
        db: &PgPool,
        code: &str,
        name: Option<&str>,
        avatar: Option<&str>,
        avatar_root: &Path,
    ) -> AppResult<Conversation> {
        let conversation = Self::get_by_code(db, code)
            .await?
            .ok_or(AppError::ConversationNotFound)?;

        let mut new_name = conversation.name.clone();
        if let Some(n) = name {
            if !n.trim().is_empty() {
                new_name = n.trim().to_string();
            }
        }

        let mut new_avatar = conversation.avatar.clone();
        if let Some(payload) = avatar {
            if let Some(encoded) = payload.strip_prefix(AVATAR_DATA_PREFIX) {
                let bytes = BASE64
                    .decode(encoded)
                    .map_err(|e| AppError::BadRequest(format!("invalid avatar image: {}", e)))?;
                new_avatar = attachment_store::store_avatar(avatar_root, &bytes).await?;
            }
        }

        let updated = sqlx::query_as::<_, Conversation>(
            "UPDATE conversations SET name = $2, avatar = $3 WHERE code = $1 RETURNING *",
        )
        .bind(code)
        .bind(&new_name)
        .bind(&new_avatar)
        .fetch_one(db)
        .await?;

        Ok(updated)
    }

    /// The caller's conversations, most recently active first. Direct
    /// conversations present the peer's name and avatar instead of the
    /// stored row's, and each entry carries a last-message preview.
    pub async fn get_history(db: &PgPool, user_code: &str) -> AppResult<Vec<ConversationSummary>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT c.* FROM conversations c \
             JOIN conversation_members cm ON cm.conversation_code = c.code \
             WHERE cm.user_code = $1 \
             ORDER BY c.last_active DESC",
        )
        .bind(user_code)
        .fetch_all(db)
        .await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let users = Self::members(db, &conversation.code).await?;

            let mut name = conversation.name;
            let mut avatar = conversation.avatar;
            if conversation.kind == ConversationKind::Direct.to_db() {
                if let Some(peer) = users.iter().find(|u| u.code != user_code) {
                    name = peer.full_name.clone();
                    avatar = peer.avatar.clone();
                }
            }

            let last_message = sqlx::query_as::<_, Message>(
                "SELECT * FROM messages WHERE conversation_code = $1 \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
            )
            .bind(&conversation.code)
            .fetch_optional(db)
            .await?;

            summaries.push(ConversationSummary {
                code: conversation.code,
                name,
                kind: ConversationKind::from_db(&conversation.kind)
                    .unwrap_or(ConversationKind::Group),
                avatar,
                last_active: conversation.last_active,
                users,
                last_message: last_message.map(|m| m.into_dto(None)),
            });
        }

        Ok(summaries)
    }

    /// Info lookup for the chat header. A group code resolves to the group
    /// shape; a direct code resolves to the peer's profile; an unknown code
    /// falls back to the contact's profile, and `None` means neither side
    /// was resolvable.
    pub async fn get_info(
        db: &PgPool,
        caller_code: &str,
        conversation_code: Option<&str>,
        contact_code: Option<&str>,
    ) -> AppResult<Option<ConversationInfo>> {
        let conversation = match conversation_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Self::get_by_code(db, code).await?,
            None => None,
        };

        if let Some(conversation) = conversation {
            if conversation.kind == ConversationKind::Group.to_db() {
                let mut users = Self::members(db, &conversation.code).await?;
                users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
                return Ok(Some(ConversationInfo::Group(GroupInfo {
                    is_group: true,
                    code: conversation.code,
                    name: conversation.name,
                    kind: ConversationKind::Group,
                    avatar: conversation.avatar,
                    users,
                })));
            }

            let peer = sqlx::query_as::<_, User>(
                "SELECT u.* FROM users u \
                 JOIN conversation_members cm ON cm.user_code = u.code \
                 WHERE cm.conversation_code = $1 AND u.code <> $2 LIMIT 1",
            )
            .bind(&conversation.code)
            .bind(caller_code)
            .fetch_optional(db)
            .await?;
            return Ok(peer.map(|u| ConversationInfo::Profile(u.profile())));
        }

        if let Some(contact) = contact_code.map(str::trim).filter(|c| !c.is_empty()) {
            let user = UserService::get_by_code(db, contact).await?;
            return Ok(user.map(|u| ConversationInfo::Profile(u.profile())));
        }

        Ok(None)
    }

    /// Add a user to a conversation's membership.
    pub async fn add_member(db: &PgPool, conversation_code: &str, user_code: &str) -> AppResult<()> {
        let mut tx = db.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM conversations WHERE code = $1")
            .bind(conversation_code)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::ConversationNotFound);
        }

        // The membership row has a foreign key on users; check first so an
        // unknown user surfaces as 404 instead of a constraint violation.
        let user_exists = sqlx::query("SELECT 1 FROM users WHERE code = $1")
            .bind(user_code)
            .fetch_optional(&mut *tx)
            .await?;
        if user_exists.is_none() {
            return Err(AppError::UserNotFound);
        }

        let inserted = sqlx::query(
            "INSERT INTO conversation_members (conversation_code, user_code) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(conversation_code)
        .bind(user_code)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(AppError::DuplicateMember);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove a user from a conversation's membership. Nothing prevents
    /// removing the creator or the last member.
    pub async fn remove_member(
        db: &PgPool,
        conversation_code: &str,
        user_code: &str,
    ) -> AppResult<()> {
        let mut tx = db.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM conversations WHERE code = $1")
            .bind(conversation_code)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::ConversationNotFound);
        }

        let deleted = sqlx::query(
            "DELETE FROM conversation_members WHERE conversation_code = $1 AND user_code = $2",
        )
        .bind(conversation_code)
        .bind(user_code)
        .execute(&mut *tx)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::MemberNotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn members(db: &PgPool, conversation_code: &str) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.code, u.full_name, u.avatar FROM users u \
             JOIN conversation_members cm ON cm.user_code = u.code \
             WHERE cm.conversation_code = $1",
        )
        .bind(conversation_code)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Member codes only, for notification fan-out.
    pub async fn member_codes(db: &PgPool, conversation_code: &str) -> AppResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT user_code FROM conversation_members WHERE conversation_code = $1",
        )
        .bind(conversation_code)
        .fetch_all(db)
        .await?;
        Ok(rows.iter().map(|r| r.get("user_code")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_prefers_explicit_conversation() {
        let target = SendTarget::from_parts(Some("c1"), Some("u2")).unwrap();
        assert_eq!(
            target,
            SendTarget::Conversation {
                code: "c1".into(),
                recipient: Some("u2".into()),
            }
        );
    }

    #[test]
    fn test_target_direct_when_no_conversation() {
        let target = SendTarget::from_parts(None, Some("u2")).unwrap();
        assert_eq!(target, SendTarget::Direct("u2".into()));
    }

    #[test]
    fn test_target_empty_strings_count_as_absent() {
        let target = SendTarget::from_parts(Some(""), Some("u2")).unwrap();
        assert_eq!(target, SendTarget::Direct("u2".into()));

        let target = SendTarget::from_parts(Some("  "), Some("u2")).unwrap();
        assert_eq!(target, SendTarget::Direct("u2".into()));
    }

    #[test]
    fn test_target_nothing_is_invalid() {
        assert!(matches!(
            SendTarget::from_parts(None, None),
            Err(AppError::InvalidTarget)
        ));
        assert!(matches!(
            SendTarget::from_parts(Some(""), Some("")),
            Err(AppError::InvalidTarget)
        ));
    }

    #[test]
    fn test_target_trims_whitespace() {
        let target = SendTarget::from_parts(Some(" c1 "), None).unwrap();
        assert_eq!(
            target,
            SendTarget::Conversation {
                code: "c1".into(),
                recipient: None,
            }
        );
    }
}
