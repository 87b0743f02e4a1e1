use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("message is empty")]
    EmptyMessage,

    #[error("no conversation or recipient to send to")]
    InvalidTarget,

    #[error("attachment write failed: {0}")]
    AttachmentWrite(String),

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("user is already a member")]
    DuplicateMember,

    #[error("member not found")]
    MemberNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("only the author may delete a message")]
    NotAuthor,

    #[error("user not found")]
    UserNotFound,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("database error: {0}")]
    Database(String),

    #[error("internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

// NOTE: No need to implement From<AppError> for actix_web::Error
// because actix-web provides a blanket impl for all ResponseError types:
// impl<T: ResponseError + 'static> From<T> for actix_web::Error

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::EmptyMessage | AppError::InvalidTarget => 400,
            AppError::Unauthorized => 401,
            AppError::NotAuthor => 403,
            AppError::ConversationNotFound
            | AppError::MemberNotFound
            | AppError::MessageNotFound
            | AppError::UserNotFound => 404,
            AppError::DuplicateMember | AppError::UsernameTaken => 409,
            AppError::AttachmentWrite(_)
            | AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::EmptyMessage.status_code(), 400);
        assert_eq!(AppError::InvalidTarget.status_code(), 400);
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::NotAuthor.status_code(), 403);
        assert_eq!(AppError::ConversationNotFound.status_code(), 404);
        assert_eq!(AppError::MemberNotFound.status_code(), 404);
        assert_eq!(AppError::MessageNotFound.status_code(), 404);
        assert_eq!(AppError::DuplicateMember.status_code(), 409);
        assert_eq!(AppError::UsernameTaken.status_code(), 409);
        assert_eq!(AppError::AttachmentWrite("disk full".into()).status_code(), 500);
        assert_eq!(AppError::Database("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_sqlx_error_maps_to_database() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_display_messages_are_human_readable() {
        assert_eq!(AppError::EmptyMessage.to_string(), "message is empty");
        assert_eq!(
            AppError::InvalidTarget.to_string(),
            "no conversation or recipient to send to"
        );
        assert_eq!(
            AppError::NotAuthor.to_string(),
            "only the author may delete a message"
        );
    }
}
