//! Message endpoints: multipart send, listings and author-only delete.

use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpResponse};
use futures_util::StreamExt as _;
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;
use crate::middleware::auth::UserId;
use crate::models::message::MessageKind;
use crate::services::conversation_service::{ConversationService, SendTarget};
use crate::services::message_service::{IncomingAttachment, MessageService};
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Deserialize)]
pub struct SendQuery {
    pub conversation_code: Option<String>,
}

/// JSON carried in the multipart `data` part. Every field is optional; a
/// bare file upload needs none of them.
#[derive(Default, Deserialize)]
pub struct SendMessageData {
    pub content: Option<String>,
    pub kind: Option<MessageKind>,
    pub send_to: Option<String>,
}

// ============================================
// Endpoints
// ============================================

/// POST /api/v1/messages
/// Send a message. Multipart body: an optional `data` JSON part plus any
/// number of file parts. The conversation is addressed either by the
/// `conversation_code` query parameter or by `send_to` in the data part.
#[post("/api/v1/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<SendQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut data: Option<SendMessageData> = None;
    let mut attachments: Vec<IncomingAttachment> = Vec::new();

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;

        let is_data = field.name() == "data";
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("upload read error: {}", e)))?;
            bytes.extend_from_slice(&chunk);
        }

        if is_data {
            data = Some(serde_json::from_slice(&bytes).map_err(|e| {
                AppError::BadRequest(format!("invalid message payload: {}", e))
            })?);
        } else if let Some(filename) = filename {
            attachments.push(IncomingAttachment {
                filename,
                data: bytes,
            });
        }
        // Parts that are neither `data` nor a named file are ignored.
    }

    let data = data.unwrap_or_default();
    let target = SendTarget::from_parts(
        query.conversation_code.as_deref(),
        data.send_to.as_deref(),
    )?;

    let message = MessageService::send(
        &state.db,
        &state.attachments,
        &user.0,
        &target,
        data.content.as_deref().unwrap_or(""),
        data.kind.unwrap_or_default(),
        attachments,
    )
    .await?;

    // Delivery is best effort: a failure here never fails the send.
    match ConversationService::member_codes(&state.db, &message.conversation_code).await {
        Ok(audience) => {
            let event = ChatEvent::MessageNew {
                conversation_code: message.conversation_code.clone(),
                message_id: message.id,
                sender_code: user.0.clone(),
            };
            events::notify_audience(&state.redis, &audience, &event).await;
        }
        Err(e) => {
            warn!(conversation = %message.conversation_code, error = %e,
                "skipping delivery notification");
        }
    }

    Ok(HttpResponse::Created().json(message.into_dto(None)))
}

/// GET /api/v1/messages/conversation/{code}
/// Messages of one conversation, oldest first. Non-members get an empty
/// list.
#[get("/api/v1/messages/conversation/{code}")]
pub async fn list_by_conversation(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let messages = MessageService::list_by_conversation(&state.db, &user.0, &code).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// GET /api/v1/messages/contact/{user_code}
/// Messages of the direct conversation with one contact; empty when no
/// conversation exists yet.
#[get("/api/v1/messages/contact/{user_code}")]
pub async fn list_by_contact(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let contact = path.into_inner();
    let messages = MessageService::list_by_contact(&state.db, &user.0, &contact).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// DELETE /api/v1/messages/{id}
/// Delete a message. Only its author may do this.
#[delete("/api/v1/messages/{id}")]
pub async fn delete_message(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    MessageService::delete(&state.db, &user.0, id).await?;
    Ok(HttpResponse::NoContent().finish())
}
