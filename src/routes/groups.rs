//! Group membership endpoints.
//!
//! Membership changes take effect on the next listing or send; no realtime
//! notification is emitted for them.

use actix_web::{delete, post, web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::UserId;
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub user_code: String,
}

/// POST /api/v1/conversations/{code}/members
/// Add a member to a conversation.
#[post("/api/v1/conversations/{code}/members")]
pub async fn add_member(
    state: web::Data<AppState>,
    _user: UserId,
    path: web::Path<String>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    ConversationService::add_member(&state.db, &code, &body.user_code).await?;
    Ok(HttpResponse::Created().finish())
}

/// DELETE /api/v1/conversations/{code}/members/{user_code}
/// Remove a member from a conversation. Removing yourself is how a user
/// leaves a group.
#[delete("/api/v1/conversations/{code}/members/{user_code}")]
pub async fn remove_member(
    state: web::Data<AppState>,
    _user: UserId,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (code, user_code) = path.into_inner();
    ConversationService::remove_member(&state.db, &code, &user_code).await?;
    Ok(HttpResponse::NoContent().finish())
}
