use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub attachment_root: PathBuf,
    pub avatar_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config("JWT_SECRET empty".into()));
        }
        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        let attachment_root = env::var("ATTACHMENT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/attachments"));
        let avatar_root = env::var("AVATAR_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/avatars"));

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            token_ttl_hours,
            attachment_root,
            avatar_root,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 8080,
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 24,
            attachment_root: PathBuf::from("data/attachments"),
            avatar_root: PathBuf::from("data/avatars"),
        }
    }
}
