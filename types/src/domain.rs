use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Pharmacy,
    Association,
    CancerCenter,
    Laboratory,
    Admin,
}

impl Role {
    /// Table holding this role's directory listing, if the role is listed at all.
    pub fn directory_table(&self) -> Option<&'static str> {
        match self {
            Role::Doctor => Some("doctors"),
            Role::Pharmacy => Some("pharmacies"),
            Role::Association => Some("associations"),
            Role::CancerCenter => Some("cancer_centers"),
            Role::Laboratory => Some("laboratories"),
            Role::Patient | Role::Admin => None,
        }
    }

    pub fn is_professional(&self) -> bool {
        self.directory_table().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub language: String,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub specialization: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    pub push_enabled: bool,
    pub email_enabled: bool,
    pub community_updates: bool,
    pub reminders: bool,
}

impl NotificationSettings {
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            push_enabled: true,
            email_enabled: true,
            community_updates: true,
            reminders: true,
        }
    }
}

/// Row of one of the role-specific directory tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub wilaya: Option<String>,
    #[serde(default)]
    pub commune: Option<String>,
}

impl DirectoryEntry {
    pub fn seed(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.full_name.clone(),
            specialization: None,
            address: None,
            phone: None,
            wilaya: user.wilaya.clone(),
            commune: user.commune.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.specialization, &self.address, &self.phone]
            .into_iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Identity as GoTrue reports it, distinct from the `users` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// True when the token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

#[derive(Debug, Clone, Validate, Deserialize, Serialize)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 2))]
    pub full_name: String,
    pub role: Role,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Validate, Deserialize, Serialize)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Validate, Deserialize, Serialize)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2))]
    pub full_name: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub language: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub specialization: Option<String>,
    pub address: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

impl UpdateProfileRequest {
    pub fn touches_user(&self) -> bool {
        self.full_name.is_some()
            || self.wilaya.is_some()
            || self.commune.is_some()
            || self.language.is_some()
            || self.avatar_url.is_some()
    }

    pub fn touches_profile(&self) -> bool {
        self.bio.is_some()
            || self.specialization.is_some()
            || self.address.is_some()
            || self.website.is_some()
    }
}

#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
pub struct CompleteProfileRequest {
    #[validate(length(min = 2))]
    pub specialization: String,
    #[validate(length(min = 4))]
    pub address: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
}
