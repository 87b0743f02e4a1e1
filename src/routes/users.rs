use actix_web::{get, web, HttpResponse};

use crate::error::AppError;
use crate::middleware::auth::UserId;
use crate::services::user_service::UserService;
use crate::state::AppState;

/// Everyone except the caller, for starting a direct conversation.
#[get("/api/v1/users/contacts")]
pub async fn contacts(
    state: web::Data<AppState>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    let contacts = UserService::contacts(&state.db, &user.0).await?;
    Ok(HttpResponse::Ok().json(contacts))
}
