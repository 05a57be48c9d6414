use client::storage::SessionStorage;
use color_eyre::eyre::Result;
use keyring::Entry;
use log::warn;
use types::domain::Session;

const SERVICE: &str = "canstory";
const ACCOUNT: &str = "session";

/// Keeps the session in the OS credential store so a relaunch stays signed in.
pub struct KeyringStorage {
    entry: Entry,
}

impl KeyringStorage {
    pub fn new() -> Result<Self> {
        Ok(Self {
            entry: Entry::new(SERVICE, ACCOUNT)?,
        })
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<Session>> {
        let raw = match self.entry.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding unreadable stored session: {}", e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn store(&self, session: &Session) -> Result<()> {
        self.entry.set_password(&serde_json::to_string(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
