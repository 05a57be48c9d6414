use std::sync::Arc;

use eyre::Result;
use uuid::Uuid;

use client::client::{Client, Filter};
use types::domain::{DirectoryEntry, Role};
use types::error::Error;

fn table(role: Role) -> Result<&'static str> {
    role.directory_table()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no directory listing", role)).into())
}

/// Role-specific directory tables (`doctors`, `pharmacies`, ...).
#[cfg_attr(test, faux::create)]
pub struct DirectoryRepository {
    client: Arc<Client>,
}

#[cfg_attr(test, faux::methods)]
impl DirectoryRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn get(&self, role: Role, user_id: Uuid) -> Result<Option<DirectoryEntry>> {
        self.client
            .select_one(table(role)?, &[Filter::eq("user_id", user_id)])
            .await
    }

    pub async fn upsert(&self, role: Role, entry: DirectoryEntry) -> Result<DirectoryEntry> {
        self.client.upsert(table(role)?, &entry, "user_id").await
    }
}
