use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

use types::domain::Session;
use types::state::AuthState;

/// Observable auth snapshot.
///
/// Anyone may read or subscribe; writes are crate-private and only the
/// bootstrapper performs them. Every write path holds a [`Ticket`], and a
/// write whose generation has been superseded is dropped.
#[derive(Clone)]
pub struct AuthStore {
    sender: Arc<watch::Sender<AuthState>>,
    generation: Arc<AtomicU64>,
}

/// Proof that a writer belongs to a given generation.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AuthState::uninitialized());
        Self {
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.sender.borrow().clone()
    }

    /// Starts a new generation, invalidating every outstanding ticket.
    pub(crate) fn begin(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            counter: self.generation.clone(),
        }
    }

    /// Joins the current generation without superseding anyone.
    pub(crate) fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation.load(Ordering::SeqCst),
            counter: self.generation.clone(),
        }
    }

    /// Publishes `state` unless `ticket` was superseded. A newer session for
    /// the same user already in the store is kept.
    pub(crate) fn publish(&self, ticket: &Ticket, mut state: AuthState) -> bool {
        self.sender.send_if_modified(|current| {
            if !ticket.is_current() {
                debug!("Dropping auth snapshot from superseded generation {}", ticket.generation);
                return false;
            }
            if let (Some(held), Some(incoming)) = (&current.session, &state.session) {
                if held.user_id() == incoming.user_id() && held.expires_at > incoming.expires_at {
                    state.session = Some(held.clone());
                }
            }
            *current = state;
            true
        })
    }

    /// Swaps in a refreshed session, leaving `user` and `profile` untouched.
    /// Ignored once the store has settled into a signed-out state.
    pub(crate) fn update_session(&self, session: Session) -> bool {
        self.sender.send_if_modified(|current| {
            let signed_in = current
                .session
                .as_ref()
                .is_some_and(|held| held.user_id() == session.user_id());
            if current.initialized && !signed_in {
                debug!("Ignoring refreshed session for {} while signed out", session.user_id());
                return false;
            }
            current.session = Some(session);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use types::state::Phase;

    use crate::test_support::{session, user};
    use types::domain::Role;

    #[test]
    fn starts_uninitialized() {
        let store = AuthStore::new();
        assert_eq!(store.current(), AuthState::uninitialized());
        assert_eq!(store.current().phase(), Phase::Loading);
    }

    #[test]
    fn superseded_ticket_cannot_publish() {
        let store = AuthStore::new();
        let stale = store.begin();
        let fresh = store.begin();

        assert!(!stale.is_current());
        assert!(store.publish(&fresh, AuthState::anonymous()));
        let doctor = user(Role::Doctor, true);
        assert!(!store.publish(
            &stale,
            AuthState::authenticated(Some(doctor.clone()), None, session(doctor.id))
        ));
        assert_eq!(store.current(), AuthState::anonymous());
    }

    #[test]
    fn joined_ticket_is_invalidated_by_begin() {
        let store = AuthStore::new();
        store.begin();
        let joined = store.ticket();
        assert!(joined.is_current());
        store.begin();
        assert!(!joined.is_current());
    }

    #[tokio::test]
    async fn subscribers_see_published_snapshots() {
        let store = AuthStore::new();
        let mut receiver = store.subscribe();
        let ticket = store.begin();

        store.publish(&ticket, AuthState::anonymous());

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), AuthState::anonymous());
    }

    #[test]
    fn refreshed_session_keeps_rows() {
        let store = AuthStore::new();
        let patient = user(Role::Patient, true);
        let ticket = store.begin();
        store.publish(
            &ticket,
            AuthState::authenticated(Some(patient.clone()), None, session(patient.id)),
        );
        let before = store.current();

        let mut refreshed = session(patient.id);
        refreshed.access_token = "access-2".to_string();
        assert!(store.update_session(refreshed.clone()));

        let after = store.current();
        assert_eq!(after.session, Some(refreshed));
        assert!(Arc::ptr_eq(
            before.user.as_ref().unwrap(),
            after.user.as_ref().unwrap()
        ));
    }

    #[test]
    fn refreshed_session_ignored_when_signed_out() {
        let store = AuthStore::new();
        let ticket = store.begin();
        store.publish(&ticket, AuthState::anonymous());

        assert!(!store.update_session(session(uuid::Uuid::from_u128(1))));
        assert_eq!(store.current(), AuthState::anonymous());
    }

    #[test]
    fn publish_keeps_a_newer_session() {
        let store = AuthStore::new();
        let patient = user(Role::Patient, true);
        let mut newer = session(patient.id);
        newer.expires_at = newer.expires_at + Duration::hours(1);
        let ticket = store.begin();
        store.publish(
            &ticket,
            AuthState {
                session: Some(newer.clone()),
                ..AuthState::uninitialized()
            },
        );

        store.publish(
            &ticket,
            AuthState::authenticated(Some(patient.clone()), None, session(patient.id)),
        );

        assert_eq!(store.current().session, Some(newer));
    }
}
