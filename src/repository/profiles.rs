use std::sync::Arc;

use eyre::Result;
use serde::Serialize;
use uuid::Uuid;

use client::client::{Client, Filter};
use types::domain::Profile;

const TABLE: &str = "user_profiles";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[cfg_attr(test, faux::create)]
pub struct ProfileRepository {
    client: Arc<Client>,
}

#[cfg_attr(test, faux::methods)]
impl ProfileRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.client
            .select_one(TABLE, &[Filter::eq("user_id", user_id)])
            .await
    }

    /// Creates the profile on first write.
    pub async fn upsert(&self, patch: ProfilePatch) -> Result<Profile> {
        self.client.upsert(TABLE, &patch, "user_id").await
    }
}
