//! Typed session API over a key-value store.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};

/// Local record of an authenticated user and their UI selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token. Never validated locally.
    pub token: String,
    /// Id of the logged-in user.
    pub user_id: u64,
    /// Username entered at login, for display.
    #[serde(default)]
    pub username: Option<String>,
    /// Peer whose conversation was open when the client last ran.
    #[serde(default)]
    pub selected_peer_id: Option<u64>,
}

/// Session persistence: `load`, `save` and `clear`.
///
/// Token authenticity is the backend's business; this type only stores
/// what it is given.
pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a new session store with the given backend.
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Load the persisted session.
    ///
    /// Returns `None` when there is no token or the stored user id is not a
    /// number. An unparseable selection is read as "no selection".
    pub fn load(&self) -> StorageResult<Option<Session>> {
        let Some(token) = self.token()? else {
            return Ok(None);
        };

        let user_id = match self.storage.get(StorageKeys::USER_ID)? {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(raw = %raw, "stored user id is not numeric, ignoring session");
                    return Ok(None);
                }
            },
            None => {
                tracing::debug!("token stored without user id");
                return Ok(None);
            }
        };

        let selected_peer_id = self
            .storage
            .get(StorageKeys::SELECTED_USER_ID)?
            .and_then(|raw| raw.trim().parse::<u64>().ok());

        Ok(Some(Session {
            token,
            user_id,
            username: self.storage.get(StorageKeys::USERNAME)?,
            selected_peer_id,
        }))
    }

    /// Persist every field of `session`, removing keys for absent fields.
    pub fn save(&self, session: &Session) -> StorageResult<()> {
        self.storage.set(StorageKeys::TOKEN, &session.token)?;
        self.storage
            .set(StorageKeys::USER_ID, &session.user_id.to_string())?;

        match &session.username {
            Some(username) => self.storage.set(StorageKeys::USERNAME, username)?,
            None => {
                self.storage.delete(StorageKeys::USERNAME)?;
            }
        }

        match session.selected_peer_id {
            Some(peer_id) => self.set_selected_peer(peer_id)?,
            None => self.clear_selected_peer()?,
        }

        tracing::debug!(user_id = session.user_id, "session saved");
        Ok(())
    }

    /// Remove all session keys together.
    pub fn clear(&self) -> StorageResult<()> {
        for key in StorageKeys::ALL {
            self.storage.delete(key)?;
        }
        tracing::info!("session cleared");
        Ok(())
    }

    /// The stored token, if any. Empty strings count as absent.
    pub fn token(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::TOKEN)?
            .filter(|t| !t.trim().is_empty()))
    }

    /// Store just the token (first half of the two-step login).
    pub fn set_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::TOKEN, token)
    }

    /// Record the selected peer.
    pub fn set_selected_peer(&self, peer_id: u64) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::SELECTED_USER_ID, &peer_id.to_string())
    }

    /// Forget the selected peer.
    pub fn clear_selected_peer(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::SELECTED_USER_ID)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn store() -> (MemoryStore, SessionStore) {
        let backing = MemoryStore::new();
        let sessions = SessionStore::new(Box::new(backing.clone()));
        (backing, sessions)
    }

    fn session() -> Session {
        Session {
            token: "jwt-token".to_string(),
            user_id: 7,
            username: Some("alice".to_string()),
            selected_peer_id: Some(2),
        }
    }

    #[test]
    fn test_load_empty_is_none() {
        let (_, sessions) = store();
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let (backing, sessions) = store();
        sessions.save(&session()).unwrap();

        assert_eq!(sessions.load().unwrap(), Some(session()));
        assert_eq!(
            backing.get(StorageKeys::SELECTED_USER_ID).unwrap(),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_save_removes_absent_fields() {
        let (backing, sessions) = store();
        sessions.save(&session()).unwrap();

        let mut bare = session();
        bare.username = None;
        bare.selected_peer_id = None;
        sessions.save(&bare).unwrap();

        assert!(!backing.has(StorageKeys::USERNAME).unwrap());
        assert!(!backing.has(StorageKeys::SELECTED_USER_ID).unwrap());
        assert_eq!(sessions.load().unwrap(), Some(bare));
    }

    #[test]
    fn test_clear_removes_every_key() {
        let (backing, sessions) = store();
        sessions.save(&session()).unwrap();
        backing.set("unrelated", "kept").unwrap();

        sessions.clear().unwrap();

        assert_eq!(sessions.load().unwrap(), None);
        for key in StorageKeys::ALL {
            assert!(!backing.has(key).unwrap());
        }
        assert_eq!(backing.len(), 1);
    }

    #[test]
    fn test_token_without_user_id_is_no_session() {
        let (_, sessions) = store();
        sessions.set_token("half-done").unwrap();

        assert_eq!(sessions.token().unwrap(), Some("half-done".to_string()));
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[test]
    fn test_non_numeric_values() {
        let (backing, sessions) = store();
        sessions.save(&session()).unwrap();

        backing.set(StorageKeys::SELECTED_USER_ID, "abc").unwrap();
        assert_eq!(sessions.load().unwrap().unwrap().selected_peer_id, None);

        backing.set(StorageKeys::USER_ID, "NaN").unwrap();
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[test]
    fn test_blank_token_is_absent() {
        let (backing, sessions) = store();
        sessions.save(&session()).unwrap();
        backing.set(StorageKeys::TOKEN, "  ").unwrap();

        assert_eq!(sessions.token().unwrap(), None);
        assert_eq!(sessions.load().unwrap(), None);
    }
}
