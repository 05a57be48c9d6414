use std::sync::Arc;

use eyre::Result;
use serde_json::Value;
use tokio::sync::broadcast;

use client::client::{Client, SignUpOutcome};
use types::domain::{AuthEvent, Session};

/// Identity operations against the hosted auth service.
#[cfg_attr(test, faux::create)]
pub struct AuthRepository {
    client: Arc<Client>,
}

#[cfg_attr(test, faux::methods)]
impl AuthRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    pub async fn get_session(&self) -> Result<Option<Session>> {
        self.client.get_session().await
    }

    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.client.on_auth_state_change()
    }

    pub async fn sign_in(&self, email: String, password: String) -> Result<Session> {
        self.client.sign_in_with_password(&email, &password).await
    }

    pub async fn sign_up(
        &self,
        email: String,
        password: String,
        metadata: Value,
    ) -> Result<SignUpOutcome> {
        self.client.sign_up(&email, &password, metadata).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.client.sign_out().await
    }

    pub async fn reset_password(&self, email: String) -> Result<()> {
        self.client.reset_password_for_email(&email).await
    }
}
