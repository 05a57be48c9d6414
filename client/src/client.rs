use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use eyre::{Result, WrapErr};
use log::{debug, info, warn};
use reqwest::Client as ReqwestClient;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tap::TapFallible;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use types::domain::{AuthEvent, AuthUser, Session};
use types::error::Error;

use crate::storage::{MemoryStorage, SessionStorage};

/// Refresh this long before the access token actually expires.
const REFRESH_MARGIN_SECS: i64 = 60;
/// Pause after a refresh that failed without the token being rejected.
const REFRESH_RETRY: StdDuration = StdDuration::from_secs(10);
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub anon_key: String,
}

/// PostgREST equality filter, rendered as `column=eq.value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            value: format!("eq.{}", value.to_string()),
        }
    }

    fn as_pair(&self) -> (&str, &str) {
        (self.column.as_str(), self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    /// `None` while the email address still awaits confirmation.
    pub session: Option<Session>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

async fn backend_error(response: Response) -> eyre::Report {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.to_string()
            } else {
                text
            }
        });
    debug!("Backend responded {}: {}", status, message);
    Error::Backend(message).into()
}

async fn json_or_error<T: DeserializeOwned>(response: Response) -> Result<T> {
    if response.status().is_success() {
        response.json().await.wrap_err("Malformed backend response")
    } else {
        Err(backend_error(response).await)
    }
}

async fn ok_or_error(response: Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(backend_error(response).await)
    }
}

/// Client for the hosted backend: GoTrue under `/auth/v1`, PostgREST under
/// `/rest/v1`.
pub struct Client {
    http: ReqwestClient,
    config: ClientConfig,
    session: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<AuthEvent>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::default()))
    }

    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http: ReqwestClient::new(),
            config,
            session: RwLock::new(None),
            storage,
            events,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    /// Auth endpoints are called with the anon key, never a user token.
    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.config.anon_key.as_str())
            .bearer_auth(&self.config.anon_key)
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone());
        builder
            .header("apikey", self.config.anon_key.as_str())
            .bearer_auth(token)
    }

    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            debug!("No auth listeners subscribed");
        }
    }

    async fn set_session(&self, session: Session) {
        self
            .storage
            .store(&session)
            .tap_err(|e| warn!("Failed to persist session: {:?}", e))
            .ok();
        self.session.write().await.replace(session);
    }

    async fn clear_session(&self) {
        self.session.write().await.take();
        self
            .storage
            .clear()
            .tap_err(|e| warn!("Failed to clear stored session: {:?}", e))
            .ok();
    }

    /// Current session, loading it from storage on first use and refreshing
    /// it when it is about to expire.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        let cached = self.session.read().await.clone();
        let session = match cached {
            Some(session) => session,
            None => match self.storage.load()? {
                Some(session) => {
                    self.session.write().await.replace(session.clone());
                    session
                }
                None => return Ok(None),
            },
        };
        if session.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) {
            debug!("Session for {} is expiring, refreshing", session.user_id());
            return self.refresh_with(&session.refresh_token).await.map(Some);
        }
        Ok(Some(session))
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .anon(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: Session = json_or_error(response).await?;
        info!("Signed in as {}", session.user_id());
        self.set_session(session.clone()).await;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Registers a new identity. `metadata` lands in the identity's user
    /// metadata.
    pub async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome> {
        let response = self
            .anon(self.http.post(self.auth_url("signup")))
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        match json_or_error(response).await? {
            SignUpResponse::Session(session) => {
                info!("Signed up and signed in as {}", session.user_id());
                self.set_session(session.clone()).await;
                self.emit(AuthEvent::SignedIn(session.clone()));
                Ok(SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                info!("Signed up {}, awaiting email confirmation", user.id);
                Ok(SignUpOutcome {
                    user,
                    session: None,
                })
            }
        }
    }

    /// Always ends signed out locally, even when the backend call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());
        if let Some(token) = token {
            let result = self
                .http
                .post(self.auth_url("logout"))
                .header("apikey", self.config.anon_key.as_str())
                .bearer_auth(token)
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!("Backend rejected logout: {}", response.status())
                }
                Err(e) => warn!("Logout request failed: {:?}", e),
                Ok(_) => {}
            }
        }
        self.clear_session().await;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    pub async fn reset_password_for_email(&self, email: &str) -> Result<()> {
        let response = self
            .anon(self.http.post(self.auth_url("recover")))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        ok_or_error(response).await
    }

    pub async fn refresh_session(&self) -> Result<Session> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(Error::NotAuthenticated)?;
        self.refresh_with(&refresh_token).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .anon(self.http.post(self.auth_url("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !response.status().is_success() {
            // A rejected refresh token ends the session.
            let error = backend_error(response).await;
            warn!("Session refresh rejected: {}", error);
            self.clear_session().await;
            self.emit(AuthEvent::SignedOut);
            return Err(error);
        }
        let session: Session = response
            .json()
            .await
            .wrap_err("Malformed refresh response")?;
        debug!("Refreshed session for {}", session.user_id());
        self.set_session(session.clone()).await;
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    /// Keeps the session fresh in the background until the handle is aborted.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let mut events = client.on_auth_state_change();
        tokio::spawn(async move {
            let mut retry_after: Option<StdDuration> = None;
            loop {
                let expires_at = client.session.read().await.as_ref().map(|s| s.expires_at);
                let Some(expires_at) = expires_at else {
                    match events.recv().await {
                        Err(RecvError::Closed) => break,
                        _ => continue,
                    }
                };
                let wait = (expires_at - Duration::seconds(REFRESH_MARGIN_SECS) - Utc::now())
                    .to_std()
                    .unwrap_or(StdDuration::ZERO);
                let wait = retry_after.map_or(wait, |retry| wait.max(retry));
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        retry_after = match client.refresh_session().await {
                            Ok(_) => None,
                            Err(e) => {
                                warn!(
                                    "Automatic refresh failed, retrying in {:?}: {:?}",
                                    REFRESH_RETRY, e
                                );
                                Some(REFRESH_RETRY)
                            }
                        };
                    }
                    event = events.recv() => match event {
                        Err(RecvError::Closed) => break,
                        Ok(AuthEvent::SignedIn(_)) | Ok(AuthEvent::SignedOut) => retry_after = None,
                        _ => {}
                    }
                }
            }
        })
    }

    pub async fn select<T: DeserializeOwned>(&self, table: &str, filters: &[Filter]) -> Result<Vec<T>> {
        let query: Vec<(&str, &str)> = filters.iter().map(Filter::as_pair).collect();
        let response = self
            .authorized(self.http.get(self.rest_url(table)))
            .await
            .query(&[("select", "*")])
            .query(&query)
            .send()
            .await?;
        json_or_error(response).await
    }

    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Option<T>> {
        Ok(self.select(table, filters).await?.into_iter().next())
    }

    pub async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .authorized(self.http.post(self.rest_url(table)))
            .await
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        ok_or_error(response).await
    }

    pub async fn upsert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
        on_conflict: &str,
    ) -> Result<R> {
        let response = self
            .authorized(self.http.post(self.rest_url(table)))
            .await
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(row)
            .send()
            .await?;
        let rows: Vec<R> = json_or_error(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Backend(format!("Upsert into {} returned no rows", table)).into())
    }

    pub async fn update<T: Serialize + ?Sized>(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &T,
    ) -> Result<()> {
        let query: Vec<(&str, &str)> = filters.iter().map(Filter::as_pair).collect();
        let response = self
            .authorized(self.http.patch(self.rest_url(table)))
            .await
            .query(&query)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        ok_or_error(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_renders_postgrest_equality() {
        let filter = Filter::eq("id", uuid::Uuid::from_u128(7));
        assert_eq!(
            filter.as_pair(),
            ("id", "eq.00000000-0000-0000-0000-000000000007")
        );
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        let client = Client::new(ClientConfig {
            url: "https://canstory.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        });
        assert_eq!(
            client.auth_url("token"),
            "https://canstory.supabase.co/auth/v1/token"
        );
        assert_eq!(
            client.rest_url("users"),
            "https://canstory.supabase.co/rest/v1/users"
        );
    }
}
