//! Conversation endpoints: history listing, header info lookup, group
//! creation and group profile updates.

use actix_web::{get, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::UserId;
use crate::models::conversation::{ConversationKind, GroupInfo};
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Deserialize)]
pub struct InfoQuery {
    pub conversation_code: Option<String>,
    pub contact_code: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    /// Base64 PNG data URL; any other payload leaves the stored avatar
    /// untouched.
    pub avatar: Option<String>,
}

// ============================================
// Endpoints
// ============================================

/// GET /api/v1/conversations
/// The caller's conversation history, most recently active first.
#[get("/api/v1/conversations")]
pub async fn get_history(
    state: web::Data<AppState>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let history = ConversationService::get_history(&state.db, &user.0).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// GET /api/v1/conversations/info
/// Header info for a conversation or a contact. Responds with JSON `null`
/// when neither parameter resolves to anything.
#[get("/api/v1/conversations/info")]
pub async fn get_info(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<InfoQuery>,
) -> Result<HttpResponse, AppError> {
    let info = ConversationService::get_info(
        &state.db,
        &user.0,
        query.conversation_code.as_deref(),
        query.contact_code.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(info))
}

/// POST /api/v1/conversations
/// Create a group conversation. The caller becomes a member whether or not
/// they listed themselves.
#[post("/api/v1/conversations")]
pub async fn create_group(
    state: web::Data<AppState>,
    user: UserId,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation =
        ConversationService::create_group(&state.db, &user.0, &body.name, &body.members).await?;
    let users = ConversationService::members(&state.db, &conversation.code).await?;

    Ok(HttpResponse::Created().json(GroupInfo {
        is_group: true,
        code: conversation.code,
        name: conversation.name,
        kind: ConversationKind::Group,
        avatar: conversation.avatar,
        users,
    }))
}

/// PUT /api/v1/conversations/{code}
/// Update a group's display name and avatar.
#[put("/api/v1/conversations/{code}")]
pub async fn update_group(
    state: web::Data<AppState>,
    _user: UserId,
    path: web::Path<String>,
    body: web::Json<UpdateGroupRequest>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let conversation = ConversationService::update_group(
        &state.db,
        &code,
        body.name.as_deref(),
        body.avatar.as_deref(),
        &state.config.avatar_root,
    )
    .await?;
    let users = ConversationService::members(&state.db, &conversation.code).await?;
    let kind =
        ConversationKind::from_db(&conversation.kind).unwrap_or(ConversationKind::Group);

    Ok(HttpResponse::Ok().json(GroupInfo {
        is_group: kind == ConversationKind::Group,
        code: conversation.code,
        name: conversation.name,
        kind,
        avatar: conversation.avatar,
        users,
    }))
}
