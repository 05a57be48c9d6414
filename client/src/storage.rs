use std::sync::Mutex;

use eyre::{eyre, Result};
use types::domain::Session;

/// Where the client keeps the session between launches.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn store(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local storage; sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>> {
        let session = self
            .session
            .lock()
            .map_err(|_| eyre!("session storage poisoned"))?;
        Ok(session.clone())
    }

    fn store(&self, session: &Session) -> Result<()> {
        self.session
            .lock()
            .map_err(|_| eyre!("session storage poisoned"))?
            .replace(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.session
            .lock()
            .map_err(|_| eyre!("session storage poisoned"))?
            .take();
        Ok(())
    }
}
