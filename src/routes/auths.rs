use actix_web::{post, web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::auth_service::{AuthService, NewUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[post("/api/v1/auth/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    let profile = AuthService::signup(&state.db, &body).await?;
    Ok(HttpResponse::Created().json(profile))
}

#[post("/api/v1/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let access = AuthService::login(
        &state.db,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
        &body.username,
        &body.password,
    )
    .await?;
    Ok(HttpResponse::Ok().json(access))
}
