use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageDto, MessageKind};
use crate::services::attachment_store::AttachmentStore;
use crate::services::conversation_service::{ConversationService, SendTarget};

/// An uploaded file as it arrives from the multipart boundary, before it
/// has a stored name or path.
#[derive(Debug, Clone)]
pub struct IncomingAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

pub struct MessageService;

impl MessageService {
    /// The ingestion pipeline: validate, resolve the conversation, persist
    /// attachments, then write the message row and bump the conversation's
    /// last activity in one transaction. An attachment write failure aborts
    /// before any message row exists.
    pub async fn send(
        db: &PgPool,
        store: &AttachmentStore,
        sender_code: &str,
        target: &SendTarget,
        content: &str,
        kind: MessageKind,
        attachments: Vec<IncomingAttachment>,
    ) -> AppResult<Message> {
        // Zero-byte uploads are dropped outright; a message must never
        // reference an attachment that was not written.
        let attachments: Vec<IncomingAttachment> = attachments
            .into_iter()
            .filter(|a| {
                if a.data.is_empty() {
                    debug!(filename = %a.filename, "dropping empty attachment");
                    false
                } else {
                    true
                }
            })
            .collect();

        let mut content = content.trim().to_string();
        if content.is_empty() && attachments.is_empty() {
            return Err(AppError::EmptyMessage);
        }

        let conversation = ConversationService::resolve(db, sender_code, target).await?;

        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in &attachments {
            stored.push(store.store(&attachment.filename, &attachment.data).await?);
        }

        // A caption-less upload is labeled with the first file's original
        // filename so listings have something to show.
        if content.is_empty() {
            if let Some(first) = stored.first() {
                content = first.original_name.clone();
            }
        }
        let attachment_path = stored.first().map(|s| s.public_path.clone());

        let mut tx = db.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (conversation_code, sender_code, content, attachment_path, kind) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&conversation.code)
        .bind(sender_code)
        .bind(&content)
        .bind(&attachment_path)
        .bind(kind.to_db())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_active = $2 WHERE code = $1")
            .bind(&conversation.code)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = message.id, conversation = %message.conversation_code, "message persisted");
        Ok(message)
    }

    /// Messages of one conversation, oldest first, each carrying the
    /// sender's avatar. The membership filter is part of the query, so a
    /// non-member gets an empty list rather than an error.
    pub async fn list_by_conversation(
        db: &PgPool,
        user_code: &str,
        conversation_code: &str,
    ) -> AppResult<Vec<MessageDto>> {
        let rows = sqlx::query(
            "SELECT m.id, m.conversation_code, m.sender_code, m.content, m.attachment_path, \
                    m.kind, m.created_at, u.avatar AS sender_avatar \
             FROM messages m \
             JOIN users u ON u.code = m.sender_code \
             WHERE m.conversation_code = $1 \
               AND EXISTS (SELECT 1 FROM conversation_members cm \
                           WHERE cm.conversation_code = m.conversation_code \
                             AND cm.user_code = $2) \
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(conversation_code)
        .bind(user_code)
        .fetch_all(db)
        .await?;

        let messages = rows
            .into_iter()
            .map(|row| {
                let created_at: DateTime<Utc> = row.get("created_at");
                MessageDto {
                    id: row.get("id"),
                    conversation_code: row.get("conversation_code"),
                    sender_code: row.get("sender_code"),
                    content: row.get("content"),
                    attachment_path: row.get("attachment_path"),
                    kind: row.get("kind"),
                    created_at: created_at.to_rfc3339(),
                    sender_avatar: Some(row.get("sender_avatar")),
                }
            })
            .collect();

        Ok(messages)
    }

    /// Messages of the direct conversation with one contact; empty when no
    /// conversation exists yet.
    pub async fn list_by_contact(
        db: &PgPool,
        user_code: &str,
        contact_code: &str,
    ) -> AppResult<Vec<MessageDto>> {
        match ConversationService::find_direct(db, user_code, contact_code).await? {
            Some(conversation) => {
                Self::list_by_conversation(db, user_code, &conversation.code).await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Hard delete, author only.
    pub async fn delete(db: &PgPool, sender_code: &str, message_id: i64) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM messages WHERE id = $1 AND sender_code = $2")
            .bind(message_id)
            .bind(sender_code)
            .execute(db)
            .await?;

        if deleted.rows_affected() == 0 {
            // Distinguish a missing row from someone else's message
            let exists = sqlx::query("SELECT 1 FROM messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(db)
                .await?;
            return Err(if exists.is_some() {
                AppError::NotAuthor
            } else {
                AppError::MessageNotFound
            });
        }

        Ok(())
    }
}
