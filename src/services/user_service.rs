use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{User, UserSummary};

pub struct UserService;

impl UserService {
    pub async fn get_by_code(db: &PgPool, code: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE code = $1")
            .bind(code)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Everyone except the caller, for the contact picker.
    pub async fn contacts(db: &PgPool, caller_code: &str) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT code, full_name, avatar FROM users WHERE code <> $1 ORDER BY full_name",
        )
        .bind(caller_code)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Record the realtime session currently addressing this user.
    pub async fn set_current_session(
        db: &PgPool,
        user_code: &str,
        session: &str,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET current_session = $2 WHERE code = $1")
            .bind(user_code)
            .bind(session)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Clear the realtime session, but only if this session still owns it.
    /// A reconnect may have replaced it while the old socket was closing.
    pub async fn clear_session_if_owned(
        db: &PgPool,
        user_code: &str,
        session: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET current_session = NULL \
             WHERE code = $1 AND current_session = $2",
        )
        .bind(user_code)
        .bind(session)
        .execute(db)
        .await?;
        Ok(())
    }
}
