use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{new_code, User, UserProfile, DEFAULT_AVATAR};
use crate::security::{jwt, password};

/// Sign-up payload after boundary deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Successful login response: the caller's identity plus a bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub user: String,
    pub full_name: String,
    pub avatar: String,
    pub token: String,
}

pub struct AuthService;

impl AuthService {
    /// Register a new user with a hashed password and the default avatar.
    pub async fn signup(db: &PgPool, new_user: &NewUser) -> AppResult<UserProfile> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username cannot be empty".into()));
        }
        if new_user.full_name.trim().is_empty() {
            return Err(AppError::BadRequest("full name cannot be empty".into()));
        }

        let taken = sqlx::query("SELECT 1 FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::UsernameTaken);
        }

        let password_hash = password::hash_password(&new_user.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (code, username, password_hash, full_name, email, phone, avatar) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(new_code())
        .bind(username)
        .bind(&password_hash)
        .bind(new_user.full_name.trim())
        .bind(&new_user.email)
        .bind(&new_user.phone)
        .bind(DEFAULT_AVATAR)
        .fetch_one(db)
        .await?;

        info!(code = %user.code, "user registered");
        Ok(user.profile())
    }

    /// Verify credentials and issue a bearer token. The same error covers
    /// an unknown username and a wrong password.
    pub async fn login(
        db: &PgPool,
        secret: &str,
        token_ttl_hours: i64,
        username: &str,
        pass: &str,
    ) -> AppResult<AccessToken> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username.trim())
            .fetch_optional(db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !password::verify_password(pass, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        sqlx::query("UPDATE users SET last_login = now() WHERE code = $1")
            .bind(&user.code)
            .execute(db)
            .await?;

        let token = jwt::issue_token(&user.code, secret, token_ttl_hours)?;

        info!(code = %user.code, "user logged in");
        Ok(AccessToken {
            user: user.code,
            full_name: user.full_name,
            avatar: user.avatar,
            token,
        })
    }
}
