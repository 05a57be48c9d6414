use std::sync::Arc;

use chrono::Utc;
use eyre::Result;
use log::{debug, info, warn};
use tap::TapFallible;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use types::domain::{AuthEvent, Profile, Session, User};
use types::error::Error;
use types::state::AuthState;

use crate::repository::auth::AuthRepository;
use crate::repository::profiles::ProfileRepository;
use crate::repository::users::UserRepository;
use crate::retry::{Attempt, Backoff};
use crate::store::{AuthStore, Ticket};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserData {
    pub user: Option<User>,
    pub profile: Option<Profile>,
}

/// Sole writer of the [`AuthStore`]: resolves the launch session and
/// follows the auth events the backend pushes afterwards.
pub struct SessionBootstrapper {
    auth: Arc<AuthRepository>,
    users: Arc<UserRepository>,
    profiles: Arc<ProfileRepository>,
    store: AuthStore,
    backoff: Backoff,
}

/// Dropping the handle unsubscribes from auth events and cancels any
/// bootstrap still in flight.
pub struct BootstrapHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for BootstrapHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl SessionBootstrapper {
    pub fn new(
        auth: Arc<AuthRepository>,
        users: Arc<UserRepository>,
        profiles: Arc<ProfileRepository>,
        store: AuthStore,
    ) -> Self {
        Self {
            auth,
            users,
            profiles,
            store,
            backoff: Backoff::USER_LOOKUP,
        }
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// Subscribes to auth events, then runs [`Self::initialize`] alongside the
    /// listener. Events that arrive during the bootstrap are not lost.
    pub fn start(self: Arc<Self>) -> BootstrapHandle {
        let mut events = self.auth.events();
        let listener = {
            let this = self.clone();
            tokio::spawn(async move {
                let mut sign_ins = JoinSet::new();
                loop {
                    while sign_ins.try_join_next().is_some() {}
                    match events.recv().await {
                        Ok(event) => {
                            if let Some((session, ticket)) = this.apply_event(event) {
                                let this = this.clone();
                                sign_ins.spawn(async move {
                                    this.resolve_sign_in(session, ticket).await
                                });
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Missed {} auth events", missed)
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        };
        let bootstrap = tokio::spawn(async move { self.initialize().await });
        BootstrapHandle {
            tasks: vec![listener, bootstrap],
        }
    }

    /// Publishes the launch snapshot. Always ends initialized; a backend
    /// failure resolves to the signed-out state.
    pub async fn initialize(&self) {
        let ticket = self.store.begin();
        let state = match self.auth.get_session().await {
            Ok(Some(session)) => {
                let data = self.fetch_with(session.user_id(), &ticket).await;
                AuthState::authenticated(data.user, data.profile, session)
            }
            Ok(None) => {
                debug!("No stored session");
                AuthState::anonymous()
            }
            Err(e) => {
                warn!("Could not restore session: {:?}", e);
                AuthState::anonymous()
            }
        };
        self.store.publish(&ticket, state);
    }

    pub async fn fetch_user_data(&self, user_id: Uuid) -> UserData {
        self.fetch_with(user_id, &self.store.ticket()).await
    }

    async fn fetch_with(&self, user_id: Uuid, ticket: &Ticket) -> UserData {
        let lookup = self
            .backoff
            .run(|retry| async move {
                if !ticket.is_current() {
                    debug!("Lookup for {} superseded", user_id);
                    return Attempt::Done(None);
                }
                match self.users.get(user_id).await {
                    Ok(Some(user)) => Attempt::Done(Some(user)),
                    Ok(None) => {
                        debug!("User row {} missing (attempt {})", user_id, retry + 1);
                        Attempt::Retry(Error::NotFound("user"))
                    }
                    Err(e) => {
                        warn!("User lookup for {} failed: {:?}", user_id, e);
                        Attempt::Retry(Error::LookupFailed(e.to_string()))
                    }
                }
            })
            .await;

        let user = match lookup {
            Ok(Some(user)) => user,
            Ok(None) => return UserData::default(),
            Err(e) => {
                warn!(
                    "Giving up on user {} after {} retries: {}",
                    user_id, self.backoff.max_retries, e
                );
                return UserData::default();
            }
        };

        let profile = self
            .profiles
            .get(user_id)
            .await
            .tap_err(|e| warn!("Profile lookup for {} failed: {:?}", user_id, e))
            .ok()
            .flatten();
        self
            .users
            .touch_last_login(user_id, Utc::now())
            .await
            .tap_err(|e| debug!("Could not record last login for {}: {:?}", user_id, e))
            .ok();

        UserData {
            user: Some(user),
            profile,
        }
    }

    pub async fn handle_event(&self, event: AuthEvent) {
        if let Some((session, ticket)) = self.apply_event(event) {
            self.resolve_sign_in(session, ticket).await;
        }
    }

    /// Applies what an event changes right away. A sign-in hands back the
    /// user lookup that still has to run.
    fn apply_event(&self, event: AuthEvent) -> Option<(Session, Ticket)> {
        match event {
            AuthEvent::SignedIn(session) => {
                info!("Signed in: {}", session.user_id());
                let ticket = self.store.begin();
                self.store.publish(
                    &ticket,
                    AuthState {
                        session: Some(session.clone()),
                        loading: true,
                        initialized: true,
                        user: None,
                        profile: None,
                    },
                );
                Some((session, ticket))
            }
            AuthEvent::SignedOut => {
                info!("Signed out");
                let ticket = self.store.begin();
                self.store.publish(&ticket, AuthState::anonymous());
                None
            }
            AuthEvent::TokenRefreshed(session) => {
                debug!("Token refreshed for {}", session.user_id());
                self.store.update_session(session);
                None
            }
        }
    }

    async fn resolve_sign_in(&self, session: Session, ticket: Ticket) {
        let data = self.fetch_with(session.user_id(), &ticket).await;
        self.store.publish(
            &ticket,
            AuthState::authenticated(data.user, data.profile, session),
        );
    }

    /// Re-reads the signed-in user's rows. The snapshot is left alone when
    /// the rows cannot be read.
    pub async fn refresh(&self) -> Result<()> {
        let session = self
            .store
            .current()
            .session
            .ok_or(Error::NotAuthenticated)?;
        let ticket = self.store.ticket();
        let data = self.fetch_with(session.user_id(), &ticket).await;
        if !ticket.is_current() {
            debug!("Refresh for {} superseded", session.user_id());
            return match self.store.current().session {
                Some(_) => Ok(()),
                None => Err(Error::NotAuthenticated.into()),
            };
        }
        if data.user.is_none() {
            return Err(Error::LookupFailed(format!("user {}", session.user_id())).into());
        }
        self.store.publish(
            &ticket,
            AuthState::authenticated(data.user, data.profile, session),
        );
        Ok(())
    }
}
