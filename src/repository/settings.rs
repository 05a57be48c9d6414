use std::sync::Arc;

use eyre::Result;
use uuid::Uuid;

use client::client::Client;
use types::domain::NotificationSettings;

const TABLE: &str = "notification_settings";

#[cfg_attr(test, faux::create)]
pub struct SettingsRepository {
    client: Arc<Client>,
}

#[cfg_attr(test, faux::methods)]
impl SettingsRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn create_defaults(&self, user_id: Uuid) -> Result<()> {
        self.client
            .insert(TABLE, &NotificationSettings::defaults_for(user_id))
            .await
    }
}
