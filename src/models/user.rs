use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row. The password hash never leaves the service layer.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub code: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub avatar: String,
    pub current_session: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Minimal user shape embedded in conversation listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub code: String,
    pub full_name: String,
    pub avatar: String,
}

/// Profile shape returned when a conversation lookup falls back to a bare
/// contact (no conversation exists yet between the two users).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub is_group: bool,
    pub code: String,
    pub full_name: String,
    pub avatar: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            code: self.code.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            is_group: false,
            code: self.code.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            gender: self.gender.clone(),
            dob: self.dob,
        }
    }
}
