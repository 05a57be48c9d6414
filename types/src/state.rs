use std::sync::Arc;

use crate::domain::{Profile, Session, User};

/// Immutable auth snapshot published to every reader.
///
/// `user` and `profile` sit behind `Arc` so a token refresh can swap the
/// session without touching (or reallocating) the rows readers hold.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<Arc<User>>,
    pub profile: Option<Arc<Profile>>,
    pub session: Option<Session>,
    pub loading: bool,
    pub initialized: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl AuthState {
    pub fn uninitialized() -> Self {
        Self {
            user: None,
            profile: None,
            session: None,
            loading: true,
            initialized: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user: None,
            profile: None,
            session: None,
            loading: false,
            initialized: true,
        }
    }

    pub fn authenticated(user: Option<User>, profile: Option<Profile>, session: Session) -> Self {
        Self {
            user: user.map(Arc::new),
            profile: profile.map(Arc::new),
            session: Some(session),
            loading: false,
            initialized: true,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.initialized, self.loading, &self.user) {
            (false, _, _) | (_, true, _) => Phase::Loading,
            (true, false, Some(_)) => Phase::Authenticated,
            (true, false, None) => Phase::Anonymous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Authenticated,
    Anonymous,
}
