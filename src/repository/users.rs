use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use client::client::{Client, Filter};
use types::domain::{Role, User};

const TABLE: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub language: String,
    pub is_active: bool,
}

/// Column patch; `None` fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wilaya: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg_attr(test, faux::create)]
pub struct UserRepository {
    client: Arc<Client>,
}

#[cfg_attr(test, faux::methods)]
impl UserRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>> {
        self.client
            .select_one(TABLE, &[Filter::eq("id", id)])
            .await
    }

    /// Merges with a row a backend trigger may already have created.
    pub async fn upsert(&self, user: NewUser) -> Result<User> {
        self.client.upsert(TABLE, &user, "id").await
    }

    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<()> {
        self.client
            .update(TABLE, &[Filter::eq("id", id)], &patch)
            .await
    }

    pub async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.client
            .update(TABLE, &[Filter::eq("id", id)], &json!({ "last_login_at": at }))
            .await
    }
}
